//! Scoring of fresh feature records against a trained model.
use crate::analyser::containers::{FeatureRecord, FeatureValue};
use crate::errors::Error;
use crate::ml::dataset;
use crate::ml::storage::{DatasetKind, ModelArtifact, ModelStore};
use crate::ml::tree::Classifier;

/// Scores feature records with a stored model, re-aligning every record to
/// the column order the model was trained with.
pub struct Predictor {
    artifact: ModelArtifact,
    feature_order: Vec<String>,
}

impl Predictor {
    /// Loads the model and the trained column order for `kind`.
    ///
    /// Every construction reloads from the store; callers wanting
    /// low-latency repeated prediction should keep the instance around.
    pub fn new(store: &ModelStore, kind: DatasetKind, label_column: &str) -> Result<Self, Error> {
        let artifact = store.load_model(kind)?;

        let mut feature_order = dataset::load_columns(&store.dataset_path(kind))?;
        feature_order.retain(|column| column != label_column);

        log::info!(
            "Loaded model for '{kind}' ({} features, dataset {})",
            feature_order.len(),
            artifact.dataset_fingerprint
        );

        Ok(Self {
            artifact,
            feature_order,
        })
    }

    /// Predicts one label per record, in input order.
    ///
    /// Features the model was not trained on are dropped silently; features
    /// a record lacks are fed to the classifier as the NaN missing-value
    /// sentinel.
    pub fn predict(&self, records: &[FeatureRecord]) -> Vec<i64> {
        let rows: Vec<Vec<f64>> = records
            .iter()
            .map(|record| {
                self.feature_order
                    .iter()
                    .map(|column| {
                        record
                            .get(column)
                            .map(FeatureValue::as_numeric)
                            .unwrap_or(f64::NAN)
                    })
                    .collect()
            })
            .collect();

        self.artifact.tree.predict(&rows)
    }
}

/// Mean predicted label, the caller-facing malice score.
pub fn prediction_score(predictions: &[i64]) -> f64 {
    if predictions.is_empty() {
        return 0.0;
    }
    predictions.iter().sum::<i64>() as f64 / predictions.len() as f64
}
