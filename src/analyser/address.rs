//! IP and MAC address classification.
//!
//! Pure predicates over address strings, plus a process-wide vendor OUI
//! lookup used to flag traffic from unrecognised hardware vendors.
use lazy_static::lazy_static;
use std::env;
use std::fs;

/// Bundled OUI-to-vendor reference data, used when no override is configured.
const BUNDLED_VENDORS: &str = include_str!("mac-vendors.txt");

/// Env var pointing at an alternative vendor reference file.
const VENDOR_FILE_VAR: &str = "MALSNIFF_VENDOR_FILE";

lazy_static! {
    /// Process-wide vendor blob. Initialised on first OUI lookup, lowercased
    /// for comparison against tshark's lowercase MAC rendering, read-only for
    /// the rest of the process lifetime.
    static ref MAC_VENDORS: String = load_vendor_blob().to_lowercase();
}

fn load_vendor_blob() -> String {
    match env::var(VENDOR_FILE_VAR) {
        Ok(path) => match fs::read_to_string(&path) {
            Ok(blob) => {
                log::info!("Loaded vendor OUI data from {path}");
                blob
            }
            Err(err) => {
                log::warn!("Failed to read vendor file {path}: {err}; using bundled data");
                BUNDLED_VENDORS.to_string()
            }
        },
        Err(_) => BUNDLED_VENDORS.to_string(),
    }
}

/// True for loopback and private-range addresses.
///
/// The 172.16.0.0/12 block is approximated by the string prefixes `172.1`,
/// `172.2` and `172.3`, which also matches unrelated ranges such as
/// 172.255.0.0/16. Kept as-is for parity with the datasets this pipeline is
/// trained on.
pub fn is_private_ip(address: &str) -> bool {
    address.starts_with("127.0.0.")
        || address.starts_with("10.")
        || address.starts_with("172.1")
        || address.starts_with("172.2")
        || address.starts_with("172.3")
        || address.starts_with("192.168.")
}

pub fn is_public_ip(address: &str) -> bool {
    !is_private_ip(address)
}

/// Checks whether an OUI prefix (the first 8 characters of a colon-separated
/// MAC address) belongs to a known hardware vendor.
///
/// This is a raw substring search against the vendor blob, so a prefix that
/// happens to occur anywhere else in the blob also matches.
pub fn is_authorized_mac_oui(prefix: &str) -> bool {
    contains_oui(&MAC_VENDORS, &prefix.to_lowercase())
}

fn contains_oui(blob: &str, prefix: &str) -> bool {
    blob.contains(prefix)
}

/// IPv4 addresses repeatedly observed as sources of malicious traffic.
///
/// Not consulted by the extractor itself; exposed for callers that want to
/// gate or annotate traffic against it.
pub fn suspicious_ip_denylist() -> &'static [&'static str] {
    &[
        "103.251.167.20",
        "104.192.3.74",
        "107.1.241.169",
        "109.70.100.6",
        "109.70.100.70",
        "12.23.16.117",
        "12.237.159.13",
        "136.158.8.40",
        "136.35.64.112",
        "142.79.75.74",
        "150.221.171.57",
        "178.20.55.16",
        "184.81.56.182",
        "185.181.61.115",
        "185.220.100.251",
        "185.220.102.252",
        "185.220.103.114",
        "185.233.100.23",
        "185.243.218.204",
        "192.42.116.175",
        "192.42.116.180",
        "192.42.116.181",
        "192.42.116.182",
        "192.42.116.183",
        "192.42.116.185",
        "192.42.116.186",
        "192.42.116.187",
        "192.42.116.188",
        "192.42.116.191",
        "192.42.116.193",
        "192.42.116.216",
        "192.42.116.218",
        "195.176.3.20",
        "198.96.155.3",
        "209.163.98.28",
        "23.137.251.61",
        "35.142.132.202",
        "38.97.116.244",
        "45.134.225.36",
        "45.141.215.21",
        "47.147.249.100",
        "47.36.117.128",
        "67.197.64.67",
        "69.162.231.243",
        "69.245.177.224",
        "71.15.71.18",
        "71.239.208.188",
        "71.80.114.24",
        "73.95.1.137",
        "76.198.90.121",
        "76.34.17.67",
    ]
}
