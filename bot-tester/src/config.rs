use std::{path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{Address, Error, FilterChain, MessageFilter, Result};

/// Per-step wait budget used unless overridden. Default: 3s
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(3000);

/// Options for a [`BotTester`](crate::BotTester) run.
///
/// Use the builder pattern to customize, or use [`Default`] for the built-in
/// console address and a 3 second per-step timeout.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use bot_tester::Config;
///
/// let config = Config::default()
///     .with_timeout(Duration::from_millis(750))
///     .with_ignore_typing_event(true)
///     .with_message_filter(|msg: &bot_tester::Message| !msg.text_or_empty().contains("debug"));
///
/// assert_eq!(config.timeout(), Duration::from_millis(750));
/// assert_eq!(config.filter_chain().len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    default_address: Option<Address>,
    timeout: Duration,
    message_filters: Vec<MessageFilter>,
    ignore_typing_event: bool,
    ignore_end_of_conversation_event: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            default_address: Some(Address::default_console()),
            timeout: DEFAULT_TIMEOUT,
            message_filters: Vec::new(),
            ignore_typing_event: false,
            ignore_end_of_conversation_event: false,
        }
    }
}

impl Config {
    /// Parse options from their JSON form. Fields that are absent keep their
    /// defaults.
    ///
    /// ```rust
    /// let config = bot_tester::Config::from_json_str(r#"{ "timeout": 500, "ignoreTypingEvent": true }"#)?;
    /// assert_eq!(config.timeout().as_millis(), 500);
    /// # Ok::<(), bot_tester::Error>(())
    /// ```
    pub fn from_json_str(json: &str) -> Result<Self> {
        let file: ConfigFile = serde_json::from_str(json)?;
        Ok(file.into())
    }

    /// Load options from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::configuration(format!("cannot read {}: {e}", path.display())))?;
        tracing::debug!(path = %path.display(), "loaded tester config");
        Self::from_json_str(&raw)
    }

    /// Address substituted for plain-text stimuli and expectations.
    pub fn with_default_address(mut self, address: Address) -> Self {
        self.default_address = Some(address);
        self
    }

    /// Remove the default address. Plain-text steps then fail with
    /// [`Error::Configuration`](crate::Error::Configuration).
    pub fn without_default_address(mut self) -> Self {
        self.default_address = None;
        self
    }

    pub fn default_address(&self) -> Option<&Address> {
        self.default_address.as_ref()
    }

    /// Set how long a step waits for its responses.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn with_message_filter(mut self, filter: impl Into<MessageFilter>) -> Self {
        self.message_filters.push(filter.into());
        self
    }

    pub(crate) fn add_message_filter(&mut self, filter: MessageFilter) {
        self.message_filters.push(filter);
    }

    pub(crate) fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    pub fn with_ignore_typing_event(mut self, ignore: bool) -> Self {
        self.ignore_typing_event = ignore;
        self
    }

    pub fn with_ignore_end_of_conversation_event(mut self, ignore: bool) -> Self {
        self.ignore_end_of_conversation_event = ignore;
        self
    }

    /// The complete filter chain: user filters plus the enabled built-ins.
    pub fn filter_chain(&self) -> FilterChain {
        let mut chain = FilterChain::new(self.message_filters.iter().cloned());
        if self.ignore_typing_event {
            chain.push(MessageFilter::ignore_typing());
        }
        if self.ignore_end_of_conversation_event {
            chain.push(MessageFilter::ignore_end_of_conversation());
        }
        chain
    }
}

/// Serializable subset of [`Config`]. Message filters are code and have no
/// file representation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigFile {
    /// Milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_address: Option<Address>,
    #[serde(default)]
    pub ignore_typing_event: bool,
    #[serde(default)]
    pub ignore_end_of_conversation_event: bool,
}

impl From<ConfigFile> for Config {
    fn from(file: ConfigFile) -> Self {
        let mut config = Config::default()
            .with_ignore_typing_event(file.ignore_typing_event)
            .with_ignore_end_of_conversation_event(file.ignore_end_of_conversation_event);
        if let Some(ms) = file.timeout {
            config = config.with_timeout(Duration::from_millis(ms));
        }
        if let Some(address) = file.default_address {
            config = config.with_default_address(address);
        }
        config
    }
}
