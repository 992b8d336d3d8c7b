//! Dataset assembly, model training and prediction.
pub mod dataset;
pub mod predictor;
pub mod storage;
pub mod trainer;
pub mod tree;
