//! Errors surfaced by the facade.

use sable_core::{Error, ErrorKind, RegistrationError};

/// Why [`ScriptCompiler`](crate::ScriptCompiler) could not produce a unit.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScriptError {
    /// The script failed to parse or compile.
    #[error("in '{unit}': {error}")]
    Compile {
        unit: String,
        #[source]
        error: Error,
    },

    /// The standard catalog failed to build.
    #[error("failed to build catalog: {0}")]
    Catalog(#[from] RegistrationError),
}

impl ScriptError {
    pub(crate) fn compile(unit: &str, error: impl Into<Error>) -> Self {
        ScriptError::Compile {
            unit: unit.to_string(),
            error: error.into(),
        }
    }

    /// The compiler error, when the script itself was at fault.
    pub fn error(&self) -> Option<&Error> {
        match self {
            ScriptError::Compile { error, .. } => Some(error),
            ScriptError::Catalog(_) => None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ScriptError::Compile { error, .. } => error.kind(),
            ScriptError::Catalog(_) => ErrorKind::Registration,
        }
    }

    /// Whether the error should be shown to the script author.
    pub fn is_user_facing(&self) -> bool {
        self.error().is_some_and(Error::is_user_facing)
    }
}
