//! The single error type reported by routers and address resolution.

use std::error::Error;
use std::fmt;

type Cause = Box<dyn Error + Send + Sync + 'static>;

/// Failure of a router operation.
///
/// Every failing stage produces this same type; the message says which stage
/// failed and the underlying I/O error, if any, is kept as the source.
#[derive(Debug)]
pub struct RouterError {
    message: String,
    source: Option<Cause>,
}

impl RouterError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(message: impl Into<String>, source: impl Into<Cause>) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// The message without the cause appended.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for RouterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "{}: {}", self.message, source),
            None => write!(f, "{}", self.message),
        }
    }
}

impl Error for RouterError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as &(dyn Error + 'static))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_display_without_source() {
        let err = RouterError::new("router name must not be empty");
        assert_eq!(err.to_string(), "router name must not be empty");
        assert!(err.source().is_none());
    }

    #[test]
    fn test_display_appends_source() {
        let cause = io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused");
        let err = RouterError::with_source("could not create socket to 192.168.1.1:2869", cause);
        assert_eq!(
            err.to_string(),
            "could not create socket to 192.168.1.1:2869: connection refused"
        );
        assert_eq!(err.message(), "could not create socket to 192.168.1.1:2869");

        let source = err.source().expect("source should be kept");
        let io_err = source.downcast_ref::<io::Error>().unwrap();
        assert_eq!(io_err.kind(), io::ErrorKind::ConnectionRefused);
    }
}
