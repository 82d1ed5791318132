//! CLI error type

use peerwatch_catalog::CatalogError;
use peerwatch_core::tracing_setup::TracingSetupError;
use peerwatch_core::{FetchError, PeerwatchError, PlaybackError, PreferencesError, SelectionError};

/// Errors surfaced by CLI commands.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] PeerwatchError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Tracing(#[from] TracingSetupError),

    #[error("No preferences location: set XDG_CONFIG_HOME or HOME, or pass --preferences")]
    NoPreferencesPath,
}

impl CliError {
    /// Returns a user-friendly error message suitable for display.
    pub fn user_message(&self) -> String {
        match self {
            CliError::Core(e) => e.user_message(),
            CliError::Catalog(e) => e.user_message(),
            CliError::Tracing(e) => e.to_string(),
            CliError::NoPreferencesPath => self.to_string(),
        }
    }

    /// Checks if this error should be reported as a warning only.
    pub fn is_warning(&self) -> bool {
        matches!(self, CliError::Catalog(e) if e.is_warning())
    }
}

macro_rules! core_error_from {
    ($($source:ty),+ $(,)?) => {
        $(
            impl From<$source> for CliError {
                fn from(error: $source) -> Self {
                    CliError::Core(PeerwatchError::from(error))
                }
            }
        )+
    };
}

core_error_from!(FetchError, PlaybackError, PreferencesError, SelectionError);
