//! Model training over persisted datasets.
use crate::errors::Error;
use crate::ml::dataset::{self, Table};
use crate::ml::storage::{DatasetKind, ModelArtifact, ModelStore};
use crate::ml::tree::{Classifier, DecisionTree};
use chrono::Utc;
use rand::seq::SliceRandom;
use rand::thread_rng;
use std::path::Path;

/// Fraction of rows held out from fitting. The held-out subset is reserved
/// for external evaluation and is never scored here.
const HOLDOUT_FRACTION: f64 = 0.25;

/// Counts reported back after a successful training run.
#[derive(Debug)]
pub struct TrainingSummary {
    pub rows: usize,
    pub trained_rows: usize,
    pub features: usize,
}

/// Fits the decision-tree capability on a stored dataset and persists the
/// resulting model.
pub struct Trainer<'a> {
    store: &'a ModelStore,
    label_column: String,
}

impl<'a> Trainer<'a> {
    pub fn new(store: &'a ModelStore, label_column: impl Into<String>) -> Self {
        Self {
            store,
            label_column: label_column.into(),
        }
    }

    /// Loads the table for `kind`, fits on a random 75% of its rows and
    /// stores the model, overwriting any prior artifact for the same kind.
    pub fn train(&self, kind: DatasetKind) -> Result<TrainingSummary, Error> {
        let path = self.store.dataset_path(kind);
        let table = dataset::load_table(&path)?;
        let (x, y) = split_label(&table, &self.label_column, &path)?;

        if x.is_empty() {
            return Err(Error::DatasetMalformed {
                path: path.display().to_string(),
                reason: "dataset has no usable rows".to_string(),
            });
        }

        let (x_train, y_train) = train_subset(&x, &y, HOLDOUT_FRACTION);
        log::info!(
            "Fitting decision tree for '{kind}' on {} of {} rows",
            x_train.len(),
            x.len()
        );
        let tree = DecisionTree::fit(&x_train, &y_train);

        let artifact = ModelArtifact {
            tree,
            trained_at: Utc::now(),
            training_rows: x_train.len(),
            dataset_fingerprint: ModelStore::fingerprint(&path)?,
        };
        self.store.dump_model(&artifact, kind)?;

        Ok(TrainingSummary {
            rows: x.len(),
            trained_rows: x_train.len(),
            features: table.columns.len().saturating_sub(1),
        })
    }
}

/// Splits a loaded table into the feature matrix and the label vector.
/// Missing cells become the NaN sentinel; rows without a label are skipped.
fn split_label(
    table: &Table,
    label_column: &str,
    path: &Path,
) -> Result<(Vec<Vec<f64>>, Vec<i64>), Error> {
    let label_index = table
        .columns
        .iter()
        .position(|column| column == label_column)
        .ok_or_else(|| Error::DatasetMalformed {
            path: path.display().to_string(),
            reason: format!("label column '{label_column}' not found"),
        })?;

    let mut x = Vec::with_capacity(table.rows.len());
    let mut y = Vec::with_capacity(table.rows.len());
    for row in &table.rows {
        let Some(label) = row.get(label_index).copied().flatten() else {
            log::warn!("Skipping dataset row with missing label");
            continue;
        };

        let features: Vec<f64> = row
            .iter()
            .enumerate()
            .filter(|(index, _)| *index != label_index)
            .map(|(_, cell)| cell.unwrap_or(f64::NAN))
            .collect();

        x.push(features);
        y.push(label as i64);
    }

    Ok((x, y))
}

/// Random, non-deterministic subset of (1 - holdout) rows used for fitting.
fn train_subset(x: &[Vec<f64>], y: &[i64], holdout: f64) -> (Vec<Vec<f64>>, Vec<i64>) {
    let mut order: Vec<usize> = (0..x.len()).collect();
    order.shuffle(&mut thread_rng());

    let take = ((x.len() as f64) * (1.0 - holdout)).ceil() as usize;
    let take = take.clamp(1, x.len());

    let x_train = order[..take].iter().map(|&index| x[index].clone()).collect();
    let y_train = order[..take].iter().map(|&index| y[index]).collect();
    (x_train, y_train)
}
