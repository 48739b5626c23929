use super::Pid;

use crate::io::LoadError;

/// Faults raised by the kernel. None of them are recoverable; the simulation stops.
#[derive(Debug, thiserror::Error)]
pub enum KernelError {
    #[error("process {0} does not exist in the process table")]
    ProcessNotFound(Pid),

    #[error("process {pid} received malformed token {token:?}")]
    MalformedToken { pid: Pid, token: String },

    #[error("failed to load {source_id}: {error}")]
    Load {
        source_id: String,
        #[source]
        error: LoadError,
    },
}

/// Abnormal end of a process raised while executing its code.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExecutionFault {
    #[error("variable `{0}` is not defined")]
    UndefinedVariable(String),

    #[error("variable `{0}` holds end-of-file")]
    EndOfFileOperand(String),

    #[error("{0} is not a valid token index")]
    InvalidTokenIndex(f64),

    #[error("{0}")]
    Raised(String),
}
