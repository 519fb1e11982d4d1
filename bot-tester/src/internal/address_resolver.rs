use crate::{Address, Error, Message, Result};

/// Decide which conversation a stimulus belongs to.
///
/// An explicit address on the message wins. Otherwise the default address is
/// used, and without one the step cannot run.
pub(crate) fn resolve(message: &Message, default: Option<&Address>) -> Result<Address> {
    if let Some(address) = &message.address {
        return Ok(address.clone());
    }
    default.cloned().ok_or_else(|| {
        Error::configuration(format!(
            "message {message} has no address and no default address is configured"
        ))
    })
}

/// Attach the resolved address to an outgoing stimulus.
pub(crate) fn address_stimulus(mut message: Message, default: Option<&Address>) -> Result<(Message, Address)> {
    let address = resolve(&message, default)?;
    message.address = Some(address.clone());
    Ok((message, address))
}

/// Address for a session inspection step.
pub(crate) fn resolve_inspect(explicit: Option<&Address>, default: Option<&Address>) -> Result<Address> {
    explicit.or(default).cloned().ok_or_else(|| {
        Error::configuration("check_session needs an address and no default address is configured")
    })
}
