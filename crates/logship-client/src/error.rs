use crate::transmit::DeliveryError;
use std::fmt;

/// Result type for logship-client operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur in the client sync layer
#[derive(Debug)]
pub enum Error {
    /// Parser layer error
    Parser(logship_parser::Error),

    /// IO operation failed
    Io(std::io::Error),

    /// Configuration or cursor file error
    Config(String),

    /// Delivery failed fatally (batch rejected; never retried)
    Delivery(DeliveryError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Parser(err) => write!(f, "Parser error: {}", err),
            Error::Io(err) => write!(f, "IO error: {}", err),
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
            Error::Delivery(err) => write!(f, "Delivery error: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Parser(err) => Some(err),
            Error::Io(err) => Some(err),
            Error::Config(_) | Error::Delivery(_) => None,
        }
    }
}

impl From<logship_parser::Error> for Error {
    fn from(err: logship_parser::Error) -> Self {
        Error::Parser(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<DeliveryError> for Error {
    fn from(err: DeliveryError) -> Self {
        Error::Delivery(err)
    }
}
