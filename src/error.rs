use thiserror::Error;

#[derive(Error, Debug)]
pub enum AthenaError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Printer API error: {0}")]
    Api(#[from] ApiError),

    #[error("Update failed for printer at {host}: {source}")]
    UpdateFailed {
        host: String,
        #[source]
        source: ApiError,
    },

    #[error("Command error: {0}")]
    Command(#[from] CommandError),

    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),

    #[error("System error: {message}")]
    System { message: String },
}

impl AthenaError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }

    pub fn update_failed<S: Into<String>>(host: S, source: ApiError) -> Self {
        Self::UpdateFailed {
            host: host.into(),
            source,
        }
    }
}

/// Failures talking to the printer's HTTP API.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("Timeout requesting {url}")]
    Timeout { url: String },

    #[error("Error communicating with {url}: {details}")]
    Transport { url: String, details: String },

    #[error("HTTP {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Invalid JSON response from {url}: {details}")]
    InvalidJson { url: String, details: String },

    #[error("Invalid response from printer - missing {field} field")]
    MissingField { field: String },

    #[error("Unparsable body from {url}: {details}")]
    InvalidBody { url: String, details: String },
}

impl ApiError {
    /// Classify a reqwest failure for the given request URL.
    pub fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout {
                url: url.to_string(),
            }
        } else if let Some(status) = err.status() {
            ApiError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            }
        } else if err.is_decode() {
            ApiError::InvalidJson {
                url: url.to_string(),
                details: err.to_string(),
            }
        } else {
            ApiError::Transport {
                url: url.to_string(),
                details: err.to_string(),
            }
        }
    }

    /// True when the printer could not be reached at all, as opposed to
    /// answering with data we could not use.
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            ApiError::Timeout { .. } | ApiError::Transport { .. } | ApiError::HttpStatus { .. }
        )
    }
}

/// Failures of user-initiated print control commands.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommandError {
    #[error("Timeout connecting to printer while running {command}")]
    Timeout { command: String },

    #[error("Failed to {command}: {details}")]
    Failed { command: String, details: String },

    #[error("Printer rejected {command} with HTTP {status}")]
    HttpStatus { command: String, status: u16 },

    #[error("Invalid argument: {details}")]
    InvalidArgument { details: String },

    #[error("Unknown command: {name}")]
    UnknownCommand { name: String },

    #[error("Athena II device not found: {device_id}")]
    UnknownDevice { device_id: String },
}

impl CommandError {
    pub(crate) fn from_api(command: &str, err: ApiError) -> Self {
        match err {
            ApiError::Timeout { .. } => CommandError::Timeout {
                command: command.to_string(),
            },
            ApiError::HttpStatus { status, .. } => CommandError::HttpStatus {
                command: command.to_string(),
                status,
            },
            other => CommandError::Failed {
                command: command.to_string(),
                details: other.to_string(),
            },
        }
    }
}

/// Failures while capturing a camera still. These never leave the camera
/// source; they are logged and replaced by the cached frame.
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Stream request failed: {0}")]
    Stream(#[from] ApiError),

    #[error("No image data extracted from MJPEG stream")]
    NoFrame,

    #[error("JPEG decode failed: {details}")]
    Decode { details: String },

    #[error("JPEG encoding failed: {details}")]
    Encode { details: String },

    #[error("Frame processing task failed: {details}")]
    Task { details: String },
}

pub type Result<T> = std::result::Result<T, AthenaError>;
