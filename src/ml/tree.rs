//! Decision-tree classifier capability.
//!
//! The pipeline relies only on the fit/predict seam below, so any concrete
//! backend can stand in. [DecisionTree] is the bundled implementation: a
//! greedy CART-style tree with Gini impurity splitting.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Hard cap on tree depth; trees this deep on our feature counts are
/// memorising noise anyway.
const MAX_DEPTH: usize = 32;

/// The pluggable classification capability.
///
/// Rows are f64 vectors with NaN as the missing-value sentinel; labels are
/// discrete integers.
pub trait Classifier: Sized {
    fn fit(features: &[Vec<f64>], labels: &[i64]) -> Self;
    fn predict(&self, rows: &[Vec<f64>]) -> Vec<i64>;
}

#[derive(Clone, Debug, Serialize, Deserialize)]
enum Node {
    Leaf {
        label: i64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

/// Greedy binary decision tree over numeric features.
///
/// Samples route left when `value <= threshold`. NaN comparisons are false,
/// so missing values route right at both fit and predict time; a record
/// missing a feature is therefore scored the same way rows missing that cell
/// were treated during training.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DecisionTree {
    root: Node,
}

impl Classifier for DecisionTree {
    fn fit(features: &[Vec<f64>], labels: &[i64]) -> Self {
        let indices: Vec<usize> = (0..labels.len()).collect();
        DecisionTree {
            root: build_node(features, labels, &indices, 0),
        }
    }

    fn predict(&self, rows: &[Vec<f64>]) -> Vec<i64> {
        rows.iter().map(|row| classify(&self.root, row)).collect()
    }
}

fn classify(node: &Node, row: &[f64]) -> i64 {
    match node {
        Node::Leaf { label } => *label,
        Node::Split {
            feature,
            threshold,
            left,
            right,
        } => {
            let value = row.get(*feature).copied().unwrap_or(f64::NAN);
            if value <= *threshold {
                classify(left, row)
            } else {
                classify(right, row)
            }
        }
    }
}

fn build_node(features: &[Vec<f64>], labels: &[i64], indices: &[usize], depth: usize) -> Node {
    let majority = majority_label(labels, indices);

    if depth >= MAX_DEPTH || indices.len() < 2 || is_pure(labels, indices) {
        return Node::Leaf { label: majority };
    }

    let Some((feature, threshold)) = best_split(features, labels, indices) else {
        return Node::Leaf { label: majority };
    };

    let (left, right): (Vec<usize>, Vec<usize>) = indices
        .iter()
        .copied()
        .partition(|&index| value_at(features, index, feature) <= threshold);

    if left.is_empty() || right.is_empty() {
        return Node::Leaf { label: majority };
    }

    Node::Split {
        feature,
        threshold,
        left: Box::new(build_node(features, labels, &left, depth + 1)),
        right: Box::new(build_node(features, labels, &right, depth + 1)),
    }
}

/// Finds the (feature, threshold) pair minimising weighted Gini impurity.
///
/// Candidate thresholds are midpoints between consecutive distinct observed
/// values. A split is only returned when it actually improves on the parent
/// impurity; features with fewer than two distinct non-missing values are
/// skipped.
fn best_split(features: &[Vec<f64>], labels: &[i64], indices: &[usize]) -> Option<(usize, f64)> {
    let width = indices
        .iter()
        .map(|&index| features[index].len())
        .max()
        .unwrap_or(0);
    let parent_impurity = gini(labels, indices);

    let mut best: Option<(usize, f64, f64)> = None;
    for feature in 0..width {
        let mut values: Vec<f64> = indices
            .iter()
            .map(|&index| value_at(features, index, feature))
            .filter(|value| !value.is_nan())
            .collect();
        values.sort_by(|a, b| a.partial_cmp(b).expect("non-NaN values compare"));
        values.dedup();

        for pair in values.windows(2) {
            let threshold = (pair[0] + pair[1]) / 2.0;
            let (left, right): (Vec<usize>, Vec<usize>) = indices
                .iter()
                .copied()
                .partition(|&index| value_at(features, index, feature) <= threshold);
            if left.is_empty() || right.is_empty() {
                continue;
            }

            let weighted = (left.len() as f64 * gini(labels, &left)
                + right.len() as f64 * gini(labels, &right))
                / indices.len() as f64;

            let improves = match best {
                Some((_, _, best_impurity)) => weighted < best_impurity,
                None => weighted < parent_impurity,
            };
            if improves {
                best = Some((feature, threshold, weighted));
            }
        }
    }

    best.map(|(feature, threshold, _)| (feature, threshold))
}

fn value_at(features: &[Vec<f64>], row: usize, col: usize) -> f64 {
    features[row].get(col).copied().unwrap_or(f64::NAN)
}

fn is_pure(labels: &[i64], indices: &[usize]) -> bool {
    indices
        .windows(2)
        .all(|pair| labels[pair[0]] == labels[pair[1]])
}

fn label_counts(labels: &[i64], indices: &[usize]) -> BTreeMap<i64, usize> {
    let mut counts = BTreeMap::new();
    for &index in indices {
        *counts.entry(labels[index]).or_insert(0) += 1;
    }
    counts
}

/// Most frequent label; ties break towards the smallest label so rebuilding
/// from the same data yields the same tree.
fn majority_label(labels: &[i64], indices: &[usize]) -> i64 {
    let counts = label_counts(labels, indices);
    let mut best_label = 0;
    let mut best_count = 0;
    for (label, count) in counts {
        if count > best_count {
            best_label = label;
            best_count = count;
        }
    }
    best_label
}

fn gini(labels: &[i64], indices: &[usize]) -> f64 {
    let counts = label_counts(labels, indices);
    let total = indices.len() as f64;
    1.0 - counts
        .values()
        .map(|&count| {
            let p = count as f64 / total;
            p * p
        })
        .sum::<f64>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn separable_single_feature() {
        let x = vec![vec![1.0], vec![2.0], vec![9.0], vec![10.0]];
        let y = vec![0, 0, 1, 1];
        let tree = DecisionTree::fit(&x, &y);

        assert_eq!(tree.predict(&x), y);
        assert_eq!(tree.predict(&[vec![0.0], vec![100.0]]), vec![0, 1]);
    }

    #[test]
    fn second_feature_can_decide() {
        let x = vec![
            vec![5.0, 1.0],
            vec![5.0, 2.0],
            vec![5.0, 8.0],
            vec![5.0, 9.0],
        ];
        let y = vec![0, 0, 1, 1];
        let tree = DecisionTree::fit(&x, &y);

        assert_eq!(tree.predict(&[vec![5.0, 0.5]]), vec![0]);
        assert_eq!(tree.predict(&[vec![5.0, 20.0]]), vec![1]);
    }

    #[test]
    fn pure_labels_yield_constant_tree() {
        let x = vec![vec![1.0], vec![7.0], vec![3.0]];
        let y = vec![1, 1, 1];
        let tree = DecisionTree::fit(&x, &y);

        assert_eq!(tree.predict(&[vec![999.0], vec![f64::NAN]]), vec![1, 1]);
    }

    #[test]
    fn missing_value_routes_right() {
        let x = vec![vec![1.0], vec![2.0], vec![9.0], vec![10.0]];
        let y = vec![0, 0, 1, 1];
        let tree = DecisionTree::fit(&x, &y);

        // NaN fails the `<= threshold` test and falls into the right branch.
        assert_eq!(tree.predict(&[vec![f64::NAN]]), vec![1]);
    }

    #[test]
    fn short_rows_are_treated_as_missing() {
        let x = vec![
            vec![0.0, 1.0],
            vec![0.0, 2.0],
            vec![0.0, 9.0],
            vec![0.0, 10.0],
        ];
        let y = vec![0, 0, 1, 1];
        let tree = DecisionTree::fit(&x, &y);

        assert_eq!(tree.predict(&[vec![0.0]]), vec![1]);
    }

    #[test]
    fn serialises_and_restores() {
        let x = vec![vec![1.0], vec![9.0]];
        let y = vec![0, 1];
        let tree = DecisionTree::fit(&x, &y);

        let json = serde_json::to_string(&tree).unwrap();
        let restored: DecisionTree = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.predict(&x), tree.predict(&x));
    }

    #[test]
    fn empty_training_set_predicts_default_label() {
        let tree = DecisionTree::fit(&[], &[]);
        assert_eq!(tree.predict(&[vec![1.0]]), vec![0]);
    }
}
