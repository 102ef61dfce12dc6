use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    //
    // Invalid user input
    //
    #[error("Unable to find the {0}. Did you set with.{0}?")]
    MissingInput(&'static str),
    #[error("Environment variable {0} is not set")]
    MissingEnv(&'static str),
    #[error("Commit SHA is too short for a snapshot tag, at least 6 characters are required: {0:?}")]
    ShortCommitSha(String),
    #[error("Not a directory, or not exist: {0}")]
    NotADirectory(PathBuf),
    #[error(transparent)]
    InvalidUrl(#[from] url::ParseError),
    #[error("Unsupported DOCKER_HOST: {0}")]
    UnsupportedDockerHost(String),

    //
    // Error from container engine
    //
    #[error("Docker engine responds {status}: {message}")]
    EngineError { status: u16, message: String },
    #[error(transparent)]
    NetworkError(Box<ureq::Transport>),

    //
    // System error
    //
    #[error(transparent)]
    InvalidJson(#[from] serde_json::error::Error),
    #[error(transparent)]
    UnknownIo(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<walkdir::Error> for Error {
    fn from(e: walkdir::Error) -> Self {
        Self::UnknownIo(e.into())
    }
}

/// Body of a non-2xx reply of the Docker engine API
#[derive(Deserialize)]
struct ErrorResponse {
    message: String,
}

impl Error {
    /// Error for a non-2xx reply of the engine, read from its body
    pub(crate) fn from_response(status: u16, body: &str) -> Self {
        let message = match serde_json::from_str::<ErrorResponse>(body) {
            Ok(err) => err.message,
            Err(_) => body.trim().to_string(),
        };
        Error::EngineError { status, message }
    }
}

impl From<ureq::Error> for Error {
    fn from(e: ureq::Error) -> Self {
        match e {
            ureq::Error::Status(status, res) => match res.into_string() {
                Ok(body) => Error::from_response(status, &body),
                Err(e) => Error::UnknownIo(e),
            },
            ureq::Error::Transport(e) => Error::NetworkError(e.into()),
        }
    }
}
