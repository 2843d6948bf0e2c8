use snafu::prelude::*;

use crate::modules::models::section::ElementKind;

pub type CustomResult<T> = Result<T, Error>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    /************ GATES ************/
    #[snafu(display("You can't complete a section after last checkpoint"))]
    AfterLastCheckpointError,

    #[snafu(display("Skipping is only allowed after 3 attempts (lops: {lops})"))]
    SkipNotAllowedError { lops: u32 },

    #[snafu(display("Can't remove a {} that was never added", kind.name()))]
    NothingToRemoveError { kind: ElementKind },

    #[snafu(display("There is nothing to undo"))]
    NothingToUndoError,

    #[snafu(display("No run is active"))]
    NoActiveRunError,

    #[snafu(display("Run can't be submitted before the review is complete"))]
    NotReadyForSubmissionError,

    #[snafu(display("Invalid run setup: {reason}"))]
    InvalidRunSetupError { reason: String },

    #[snafu(display("Invalid value for {field}"))]
    InvalidReviewValueError { field: String },

    #[snafu(display("Team captain can't confirm a run while complaints are pending"))]
    PendingComplaintsError,

    #[snafu(display("No run with id {id} in run history"))]
    UnknownRunError { id: String },

    #[snafu(display("Deleting the run history requires confirmation"))]
    PurgeNotConfirmedError,

    #[snafu(display("Credentials are not a valid name:password token"))]
    InvalidCredentialsError,

    /************ AMBIENT ************/
    #[snafu(display("Storage failure for key {key}: {source}"))]
    StorageError {
        key: String,
        source: std::io::Error,
    },

    #[snafu(display("Could not (de)serialize {what}: {source}"))]
    SerializationError {
        what: String,
        source: serde_json::Error,
    },

    #[snafu(display("Request to {url} failed: {source}"))]
    TransportError { url: String, source: reqwest::Error },
}

impl Error {
    /// # is validation error
    /// True for the gate variants that refuse an operation without touching state.
    pub fn is_validation(&self) -> bool {
        !matches!(
            self,
            Error::StorageError { .. } | Error::SerializationError { .. } | Error::TransportError { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gates_are_validation_errors() {
        assert!(Error::NothingToUndoError.is_validation());
        assert!(Error::SkipNotAllowedError { lops: 1 }.is_validation());

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read only");
        let storage = Error::StorageError { key: "rcj-data".to_string(), source: io };
        assert!(!storage.is_validation());
        assert_eq!(storage.to_string(), "Storage failure for key rcj-data: read only");
    }
}
