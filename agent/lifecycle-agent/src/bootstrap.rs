/*!

The `bootstrap` module obtains the custom-resource event document from the invocation
environment so that the [`Agent`] and all of its parts can be constructed.

!*/

use crate::envelope::CustomResourceEvent;
use snafu::{ResultExt, Snafu};

/// The invocation runtime writes the event document to a file and passes its path in this
/// environment variable.
pub const ENV_EVENT_PATH: &str = "CUSTOM_RESOURCE_EVENT_PATH";

/// The public error type for the default [`BootstrapData`].
#[derive(Debug, Snafu)]
pub struct BootstrapError(InnerError);

/// The private error type for the default [`BootstrapData`].
#[derive(Debug, Snafu)]
pub(crate) enum InnerError {
    #[snafu(display("Unable to read environment variable '{}': {}", key, source))]
    EnvRead {
        key: String,
        source: std::env::VarError,
    },

    #[snafu(display("Unable to read event document at '{}': {}", path, source))]
    EventRead {
        path: String,
        source: std::io::Error,
    },

    #[snafu(display("Unable to parse event document at '{}': {}", path, source))]
    EventParse {
        path: String,
        source: serde_json::Error,
    },
}

/// Data that is read from the handler's invocation environment.
#[derive(Clone, Debug)]
pub struct BootstrapData {
    /// The lifecycle event we were invoked with.
    pub event: CustomResourceEvent,
}

impl BootstrapData {
    pub fn from_env() -> Result<BootstrapData, BootstrapError> {
        let path = std::env::var(ENV_EVENT_PATH).context(EnvReadSnafu {
            key: ENV_EVENT_PATH,
        })?;
        Self::from_file(&path)
    }

    /// Load the event document from `path`.
    pub fn from_file(path: &str) -> Result<BootstrapData, BootstrapError> {
        let raw = std::fs::read_to_string(path).context(EventReadSnafu { path })?;
        let event = serde_json::from_str(&raw).context(EventParseSnafu { path })?;
        Ok(BootstrapData { event })
    }
}
