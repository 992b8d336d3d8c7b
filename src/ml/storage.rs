//! Persistence for datasets and trained models.
use crate::errors::Error;
use crate::ml::tree::DecisionTree;
use chrono::{DateTime, Utc};
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Dataset domains the pipeline knows about. Keys both the dataset file and
/// the trained model artifact.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatasetKind {
    Network,
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DatasetKind::Network => write!(f, "network"),
        }
    }
}

/// Persisted classifier plus its training provenance.
#[derive(Debug, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub tree: DecisionTree,
    pub trained_at: DateTime<Utc>,
    pub training_rows: usize,
    /// MD5 of the dataset file the model was fitted from, for tying a model
    /// back to the exact dataset bytes.
    pub dataset_fingerprint: String,
}

/// Filesystem-backed store with one dataset file and one model file per
/// [DatasetKind].
///
/// Writers need external mutual exclusion per destination file; reads of
/// finished datasets and models are safe to share.
pub struct ModelStore {
    root: PathBuf,
}

impl ModelStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn dataset_path(&self, kind: DatasetKind) -> PathBuf {
        self.root.join(format!("{kind}.csv"))
    }

    pub fn model_path(&self, kind: DatasetKind) -> PathBuf {
        self.root.join(format!("{kind}.model.json"))
    }

    /// Persists a model, overwriting any prior artifact for the same kind.
    pub fn dump_model(&self, artifact: &ModelArtifact, kind: DatasetKind) -> Result<(), Error> {
        fs::create_dir_all(&self.root)?;
        let json = serde_json::to_string_pretty(artifact)?;
        fs::write(self.model_path(kind), json)?;

        log::info!("Stored model for dataset '{kind}'");
        Ok(())
    }

    pub fn load_model(&self, kind: DatasetKind) -> Result<ModelArtifact, Error> {
        let path = self.model_path(kind);
        let json = match fs::read_to_string(&path) {
            Ok(json) => json,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(Error::ModelNotFound(kind))
            }
            Err(err) => return Err(err.into()),
        };

        Ok(serde_json::from_str(&json)?)
    }

    /// MD5 hex digest of a stored file's bytes.
    pub fn fingerprint(path: &Path) -> Result<String, Error> {
        let mut hasher = Md5::new();
        hasher.update(fs::read(path)?);

        Ok(hex::encode(hasher.finalize()))
    }
}
