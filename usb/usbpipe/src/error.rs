use std::{io, result};

use syscall::error::{
    Error, EBADF, EBADMSG, EEXIST, EFAULT, EINVAL, EIO, ENOENT, EOVERFLOW, ERANGE,
};
use thiserror::Error;

pub type Result<T, E = PipeError> = result::Result<T, E>;

#[derive(Debug, Error)]
pub enum PipeError {
    #[error("descriptor too small ({0} bytes)")]
    StructureTooSmall(usize),

    #[error("no matching descriptor found")]
    NotFound,

    #[error("endpoint mapping has no pipe to initialize")]
    MissingPipeStorage,

    #[error("endpoint mapping is already bound")]
    AlreadyBound,

    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    #[error("transferred {actual} bytes, expected {expected}")]
    RangeMismatch { expected: usize, actual: usize },

    #[error("host controller connection is not open")]
    ConnectionNotOpen,

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("host controller error: {0}")]
    Hc(#[from] Error),

    #[error("invalid endpoint profile: {0}")]
    Profile(#[from] toml::de::Error),
}

impl PipeError {
    /// Errors that only concern a single endpoint descriptor. Binding recovers from these
    /// locally instead of giving up on the whole configuration.
    pub fn is_soft(&self) -> bool {
        matches!(
            self,
            Self::NotFound | Self::MissingPipeStorage | Self::AlreadyBound
        )
    }
}

impl From<PipeError> for Error {
    fn from(err: PipeError) -> Self {
        match err {
            PipeError::StructureTooSmall(_) => Error::new(ERANGE),
            PipeError::NotFound => Error::new(ENOENT),
            PipeError::MissingPipeStorage => Error::new(EFAULT),
            PipeError::AlreadyBound => Error::new(EEXIST),
            PipeError::InvalidArgument(_) => Error::new(EINVAL),
            PipeError::RangeMismatch { .. } => Error::new(EOVERFLOW),
            PipeError::ConnectionNotOpen => Error::new(EBADF),
            PipeError::Io(_) => Error::new(EIO),
            PipeError::Serialization(_) => Error::new(EBADMSG),
            PipeError::Hc(err) => err,
            PipeError::Profile(_) => Error::new(EINVAL),
        }
    }
}
