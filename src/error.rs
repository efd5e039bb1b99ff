use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// URL could not be classified as absolute, protocol-relative,
    /// query-relative or path-relative for the current session.
    #[error("Unsupported URI: {0}")]
    UnsupportedUri(String),

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Anything raised by the HTTP client itself, passed through untouched.
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

impl Error {
    pub fn unsupported_uri(url: impl Into<String>) -> Self {
        Error::UnsupportedUri(url.into())
    }

    pub fn is_unsupported_uri(&self) -> bool {
        matches!(self, Error::UnsupportedUri(_))
    }
}

impl From<config::ConfigError> for Error {
    fn from(e: config::ConfigError) -> Self {
        Error::Config(e.to_string())
    }
}
