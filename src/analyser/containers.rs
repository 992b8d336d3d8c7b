use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// A single scalar feature extracted from a captured frame.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl FeatureValue {
    /// Numeric view used when assembling classifier input rows.
    /// Booleans map to 0/1; text that is not a number becomes NaN.
    pub fn as_numeric(&self) -> f64 {
        match self {
            FeatureValue::Bool(true) => 1.0,
            FeatureValue::Bool(false) => 0.0,
            FeatureValue::Int(n) => *n as f64,
            FeatureValue::Text(s) => s.parse().unwrap_or(f64::NAN),
        }
    }
}

impl fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FeatureValue::Bool(b) => write!(f, "{b}"),
            FeatureValue::Int(n) => write!(f, "{n}"),
            FeatureValue::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<bool> for FeatureValue {
    fn from(value: bool) -> Self {
        FeatureValue::Bool(value)
    }
}

impl From<i64> for FeatureValue {
    fn from(value: i64) -> Self {
        FeatureValue::Int(value)
    }
}

impl From<&str> for FeatureValue {
    fn from(value: &str) -> Self {
        FeatureValue::Text(value.to_string())
    }
}

/// Flat, sparse summary of one captured frame.
///
/// Keys present depend on which protocol layers were detected; an absent key
/// means "not applicable to this frame", never zero.
pub type FeatureRecord = BTreeMap<String, FeatureValue>;

/// Link-layer addresses plucked from a frame.
#[derive(Clone, Debug)]
pub struct LinkData {
    pub src_mac: String,
    pub dst_mac: String,
}

/// IPv4 header fields plucked from a frame. Fields tshark did not report (or
/// reported unparseably) are None and stay out of the feature record.
#[derive(Clone, Debug)]
pub struct Ipv4Data {
    pub src: String,
    pub dst: String,
    pub version: Option<i64>,
    pub ihl: Option<i64>,
    pub tos: Option<i64>,
    pub len: Option<i64>,
    pub id: Option<i64>,
    pub frag: Option<i64>,
    pub ttl: Option<i64>,
    pub proto: Option<i64>,
    pub chksum: Option<i64>,
}

/// Transport-layer header fields. A frame carries at most one variant; TCP
/// wins when tshark reports both.
#[derive(Clone, Debug)]
pub enum TransportData {
    Tcp {
        src_port: Option<i64>,
        dest_port: Option<i64>,
        seq: Option<i64>,
        ack: Option<i64>,
        dataofs: Option<i64>,
        reserved: Option<i64>,
        window: Option<i64>,
        chksum: Option<i64>,
        urgptr: Option<i64>,
    },
    Udp {
        src_port: Option<i64>,
        dest_port: Option<i64>,
        len: Option<i64>,
        chksum: Option<i64>,
    },
}

/// One frame as plucked from the capture backend, before feature derivation.
///
/// Saves us the constant unwrapping of layers and metadata later on, and lets
/// the feature derivation run without a tshark binary in tests.
#[derive(Clone, Debug, Default)]
pub struct RawFrame {
    /// Total byte length of the frame on the wire.
    pub frame_len: i64,
    pub link: Option<LinkData>,
    pub ipv4: Option<Ipv4Data>,
    pub transport: Option<TransportData>,
    /// Body of an HTTP response, when the frame carried one. Only its
    /// presence survives into the feature record.
    pub http_payload: Option<String>,
}

/// Result blob handed to callers; the surrounding service persists it
/// verbatim.
#[derive(Clone, Debug, Serialize)]
pub struct AnalysisReport {
    pub capture: String,
    pub created_at: DateTime<Utc>,
    pub records: Vec<FeatureRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predictions: Option<Vec<i64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prediction_score: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_dataset_rendering() {
        assert_eq!(FeatureValue::Bool(true).to_string(), "true");
        assert_eq!(FeatureValue::Bool(false).to_string(), "false");
        assert_eq!(FeatureValue::Int(-40).to_string(), "-40");
        assert_eq!(FeatureValue::Text("4".into()).to_string(), "4");
    }

    #[test]
    fn numeric_view() {
        assert_eq!(FeatureValue::Bool(true).as_numeric(), 1.0);
        assert_eq!(FeatureValue::Bool(false).as_numeric(), 0.0);
        assert_eq!(FeatureValue::Int(1500).as_numeric(), 1500.0);
        assert_eq!(FeatureValue::Text("12".into()).as_numeric(), 12.0);
        assert!(FeatureValue::Text("not-a-number".into()).as_numeric().is_nan());
    }
}
