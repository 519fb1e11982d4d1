/// Boxed error returned by user callbacks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// What a `then` or `check_session` callback may return.
///
/// Plain `()` always succeeds, so assertion-style callbacks need no
/// ceremony. `Result<(), E>` fails the step with
/// [`Error::Callback`](crate::Error::Callback) when it is `Err`.
pub trait StepOutcome {
    fn into_outcome(self) -> Result<(), BoxError>;
}

impl StepOutcome for () {
    fn into_outcome(self) -> Result<(), BoxError> {
        Ok(())
    }
}

impl<E> StepOutcome for Result<(), E>
where
    E: Into<BoxError>,
{
    fn into_outcome(self) -> Result<(), BoxError> {
        self.map_err(Into::into)
    }
}
