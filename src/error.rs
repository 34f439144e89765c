use std::path::PathBuf;

use thiserror::Error;

pub type GenericError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum ItineraryError {
    #[error("Missing configuration value {0}.")]
    MissingConfig(String),
    #[error("Invalid configuration value {value:?} for {key}.")]
    InvalidConfig { key: String, value: String },
    #[error("Unknown geocoder {0:?}, expected \"mapbox\" or \"google\".")]
    UnknownGeocoder(String),
    #[error("{service} responded with HTTP status {status}.")]
    UnexpectedStatus { service: &'static str, status: u16 },
}

/// Failure of a whole ingestion attempt.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("could not read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not resolve {line:?}: {source}")]
    Transport {
        line: String,
        #[source]
        source: GenericError,
    },
}

/// A write addressed stop metadata it could not apply to. The command it
/// came from was applied as a no-op.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssociationWarning {
    #[error("No stop properties found for id: {id}")]
    MissingStop { command: &'static str, id: String },
    #[error("Property {key:?} of stop {id} rejected a value of the wrong shape")]
    RejectedValue { id: String, key: String },
}

impl AssociationWarning {
    pub fn id(&self) -> &str {
        match self {
            AssociationWarning::MissingStop { id, .. }
            | AssociationWarning::RejectedValue { id, .. } => id,
        }
    }
}
