use std::fmt::{Display, Formatter};

pub type Error = anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// The broad area in which an error occurred. Commands tag their errors with one of these before
/// returning them so that the message printed to the user says where things went wrong.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) enum ErrorType {
    /// Loading or creating the configuration directory and files.
    Config,
    /// A request to the portal API failed, either on the network or with a non-OK response.
    Request,
    /// Input was rejected before anything was sent to the portal.
    Validation,
    /// Local file output such as CSV export.
    Output,
}

impl Display for ErrorType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorType::Config => "Configuration error",
            ErrorType::Request => "Request error",
            ErrorType::Validation => "Validation error",
            ErrorType::Output => "Output error",
        };
        f.write_str(s)
    }
}

/// Extension for results that are about to cross a public command boundary.
pub(crate) trait IntoResult<T> {
    /// Wraps the error, if any, with the `ErrorType` as outermost context.
    fn pub_result(self, error_type: ErrorType) -> Result<T>;
}

impl<T, E> IntoResult<T> for std::result::Result<T, E>
where
    E: Into<Error>,
{
    fn pub_result(self, error_type: ErrorType) -> Result<T> {
        self.map_err(|e| e.into().context(error_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pub_result_keeps_the_cause() {
        let result: std::result::Result<(), Error> = Err(anyhow::anyhow!("month 13 is invalid"));
        let err = result.pub_result(ErrorType::Validation).unwrap_err();
        assert_eq!(err.to_string(), "Validation error");
        let chain = format!("{err:#}");
        assert!(chain.contains("month 13 is invalid"), "{chain}");
    }

    #[test]
    fn test_pub_result_ok_passes_through() {
        let result: std::result::Result<u32, Error> = Ok(7);
        assert_eq!(result.pub_result(ErrorType::Request).unwrap(), 7);
    }
}
