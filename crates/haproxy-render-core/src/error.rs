use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    Success = 0,
    Drift = 1,
    Validation = 2,
    InvalidArgument = 3,
    Config = 4,
}

impl ExitCode {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Success),
            1 => Some(Self::Drift),
            2 => Some(Self::Validation),
            3 => Some(Self::InvalidArgument),
            4 => Some(Self::Config),
            _ => None,
        }
    }

    pub fn code(self) -> i32 {
        self as i32
    }
}

/// Fatal failure of a rendering pass. No partial output is produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// Malformed address, out-of-range port or conflicting parameters. The
    /// message is reproduced verbatim.
    #[error("{0}")]
    Validation(String),

    /// A required value was absent or had a shape the engine cannot accept.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl RenderError {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::Validation(_) => ExitCode::Validation,
            Self::InvalidArgument(_) => ExitCode::InvalidArgument,
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }
}

pub type RenderResult<T> = Result<T, RenderError>;
