use std::fmt;

/// Custom error type for alpaca operations
/// Implements Clone so results can be cached and compared in tests
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error
{   /// Transport-level failure (connection refused, DNS, TLS)
    HttpError(String)
  , /// Server answered with a non-success status
    ApiError(String)
  , /// Failed to parse a payload
    ParseError(String)
  , /// Invalid configuration (bad URL, missing keys, bad JSON)
    InvalidConfiguration(String)
  , /// Filesystem failure while loading or writing batch files
    Io(String)
  , /// Requested model is not present on the server
    ModelNotAvailable(String)
  , /// Timeout error
    Timeout
  , /// Generic error
    Other(String)
}

impl fmt::Display for Error
{   fn fmt(&self, f: &mut fmt::Formatter<'_>)
      -> fmt::Result
    {   match self
        {   Error::HttpError(msg) => {
              write!(f, "HTTP error: {}", msg)
            }
          , Error::ApiError(msg) => {
              write!(f, "API error: {}", msg)
            }
          , Error::ParseError(msg) => {
              write!(f, "Parse error: {}", msg)
            }
          , Error::InvalidConfiguration(msg) => {
              write!(f, "Invalid configuration: {}", msg)
            }
          , Error::Io(msg) => {
              write!(f, "I/O error: {}", msg)
            }
          , Error::ModelNotAvailable(model) => {
              write!(f,
                "Model not available on server: {}",
                model
              )
            }
          , Error::Timeout => {
              write!(f, "Request timed out")
            }
          , Error::Other(msg) => {
              write!(f, "Error: {}", msg)
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<String> for Error
{   fn from(s: String) -> Self
    {   Error::Other(s)
    }
}

impl From<&str> for Error
{   fn from(s: &str) -> Self
    {   Error::Other(s.to_string())
    }
}

impl From<std::io::Error> for Error
{   fn from(e: std::io::Error) -> Self
    {   Error::Io(e.to_string())
    }
}

impl From<reqwest::Error> for Error
{   fn from(e: reqwest::Error) -> Self
    {   if e.is_timeout()
        {   Error::Timeout
        } else
        {   Error::HttpError(e.to_string())
        }
    }
}
