use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Deserializer has been closed")]
    InvalidState,

    #[error("I/O failure: {0:#}")]
    Io(anyhow::Error),

    #[error("Cannot encode record as {charset}: {reason}")]
    Encoding { charset: String, reason: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Unknown deserializer type: {0}")]
    UnknownDeserializer(String),
}

impl From<anyhow::Error> for Error {
    fn from(e: anyhow::Error) -> Self {
        Error::Io(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
