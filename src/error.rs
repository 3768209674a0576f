use std::path::PathBuf;

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the application
#[derive(Debug)]
pub enum Error {
    IoError(std::io::Error),
    ParseError { file: PathBuf, message: String },
    InvalidArgument(String),
    /// Security definition name that is not supported
    InvalidDefinition { definition: String, valid: Vec<String> },
    /// Authentication flow not permitted for the definition
    InvalidAuthenticationFlow {
        definition: String,
        flow: String,
        allowed: Vec<String>,
    },
    /// Output format that no formatter exists for
    InvalidFormat(String),
    SerializationError(String),
}

impl Error {
    /// Whether the error stems from the generator configuration.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidDefinition { .. } | Error::InvalidAuthenticationFlow { .. }
        )
    }

    /// Whether the error was raised while formatting the finished document.
    pub fn is_formatting_error(&self) -> bool {
        matches!(self, Error::InvalidFormat(_) | Error::SerializationError(_))
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::IoError(e) => write!(f, "IO error: {}", e),
            Error::ParseError { file, message } => {
                write!(f, "Parse error in {}: {}", file.display(), message)
            }
            Error::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            Error::InvalidDefinition { definition, valid } => write!(
                f,
                "Invalid definition '{}', please select from the following: {}",
                definition,
                valid.join(", ")
            ),
            Error::InvalidAuthenticationFlow {
                definition,
                flow,
                allowed,
            } => write!(
                f,
                "Invalid authentication flow '{}' for {}, please select one from the following: {}",
                flow,
                definition,
                allowed.join(", ")
            ),
            Error::InvalidFormat(format) => {
                write!(f, "Invalid format '{}', expected one of: json, yaml", format)
            }
            Error::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(format!("JSON serialization error: {}", err))
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::SerializationError(format!("YAML serialization error: {}", err))
    }
}
