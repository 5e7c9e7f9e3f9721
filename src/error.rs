//! Fatal outcomes of a bless run.
//!
//! Non-fatal resolution problems never surface here: they are logged and the
//! affected identifier degrades to zero. Everything in this enum aborts the
//! run, and each variant maps to the exit status of the step that raised it.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BlessError {
    #[error("{0}")]
    Usage(String),

    #[error("{step}: {cause:#}")]
    Classification {
        step: String,
        status: i32,
        cause: anyhow::Error,
    },

    #[error("Authorization required to modify {0}")]
    Authorization(String),

    #[error("{step}: {cause:#}")]
    Io {
        step: String,
        status: i32,
        cause: anyhow::Error,
    },

    #[error("Can't copy img4 manifests for file {path}: {cause:#}")]
    Manifest { path: String, cause: anyhow::Error },

    #[error("{step}: {cause:#}")]
    Label {
        step: String,
        status: i32,
        cause: anyhow::Error,
    },

    #[error("{step}: {cause:#}")]
    Driver { step: String, cause: anyhow::Error },

    #[error("Couldn't bless the APFS preboot volume for volume mounted at {mount}: {cause:#}")]
    Preboot { mount: String, cause: anyhow::Error },

    #[error("Couldn't personalize volume {mount}: {cause:#}")]
    Personalization { mount: String, cause: anyhow::Error },

    #[error("Can't set boot pointer to {target}: {cause:#}")]
    BootPointer { target: String, cause: anyhow::Error },
}

impl BlessError {
    pub fn classification(step: impl Into<String>, cause: anyhow::Error) -> Self {
        BlessError::Classification {
            step: step.into(),
            status: 1,
            cause,
        }
    }

    /// Role and companion lookups fail with a distinct status from type probing.
    pub fn role(step: impl Into<String>, cause: anyhow::Error) -> Self {
        BlessError::Classification {
            step: step.into(),
            status: 2,
            cause,
        }
    }

    pub fn io(step: impl Into<String>, status: i32, cause: anyhow::Error) -> Self {
        BlessError::Io {
            step: step.into(),
            status,
            cause,
        }
    }

    pub fn label(step: impl Into<String>, status: i32, cause: anyhow::Error) -> Self {
        BlessError::Label {
            step: step.into(),
            status,
            cause,
        }
    }

    /// Process exit status for this failure.
    pub fn status(&self) -> i32 {
        match self {
            BlessError::Usage(_) => 1,
            BlessError::Classification { status, .. } => *status,
            BlessError::Authorization(_) => 1,
            BlessError::Io { status, .. } => *status,
            BlessError::Manifest { .. } => 3,
            BlessError::Label { status, .. } => *status,
            BlessError::Driver { .. } => 1,
            BlessError::Preboot { .. } => 2,
            BlessError::Personalization { .. } => 1,
            BlessError::BootPointer { .. } => 3,
        }
    }
}
