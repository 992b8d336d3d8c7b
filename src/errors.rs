//! Error taxonomy of the analysis and classification pipeline.
use crate::ml::storage::DatasetKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The capture file is missing, truncated, or not a recognised capture
    /// container. Fatal for the invocation that tried to read it.
    #[error("unable to read capture '{path}': {reason}")]
    CaptureUnreadable { path: String, reason: String },

    /// Prediction was requested for a dataset that has no stored model.
    #[error("no trained model found for dataset '{0}'")]
    ModelNotFound(DatasetKind),

    /// The dataset file cannot be used as a training table.
    #[error("dataset '{path}' is malformed: {reason}")]
    DatasetMalformed { path: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}
