//! Multi-layer packet feature extraction.
//!
//! Walks a finite capture frame by frame and flattens every parseable frame
//! into a sparse [FeatureRecord], layer by layer. tshark (via rtshark) does
//! the dissection; this module plucks the handful of fields the classifier
//! cares about and derives the address-based booleans.
use super::address;
use super::containers::{FeatureRecord, FeatureValue, Ipv4Data, LinkData, RawFrame, TransportData};
use crate::errors::Error;
use rtshark::{Layer, Packet};

/// Loads a capture and emits one [FeatureRecord] per parseable frame, in
/// capture order.
///
/// Frames without a link-layer header are dropped silently; any other absent
/// layer just contributes no keys to that frame's record.
pub fn analyse(path: &str) -> Result<Vec<FeatureRecord>, Error> {
    let frames = load_capture(path)?;
    let records: Vec<FeatureRecord> = frames.iter().filter_map(frame_features).collect();

    log::info!(
        "Extracted {} feature records from {} frames in {path}",
        records.len(),
        frames.len()
    );

    Ok(records)
}

/// Reads a pcap/pcapng file via rtshark, plucking the layer data of every
/// frame into [RawFrame]s.
pub fn load_capture(path: &str) -> Result<Vec<RawFrame>, Error> {
    log::info!("Loading capture file {path}");

    let builder = rtshark::RTSharkBuilder::builder().input_path(path);

    let mut rtshark = builder.spawn().map_err(|err| Error::CaptureUnreadable {
        path: path.to_string(),
        reason: err.to_string(),
    })?;

    let mut frames = Vec::new();
    loop {
        match rtshark.read() {
            Ok(Some(packet)) => frames.push(pluck_frame(&packet)),
            Ok(None) => break,
            Err(err) => {
                rtshark.kill();
                return Err(Error::CaptureUnreadable {
                    path: path.to_string(),
                    reason: err.to_string(),
                });
            }
        }
    }
    rtshark.kill();

    Ok(frames)
}

/// Transforms an rtshark packet into a [RawFrame].
///
/// Layers that tshark did not detect stay None. TCP takes priority over UDP
/// when both are reported for one frame.
fn pluck_frame(packet: &Packet) -> RawFrame {
    let frame_len = packet
        .layer_name("frame")
        .and_then(|frame| meta_int(frame, "frame.len"))
        .unwrap_or(0);

    let link = packet.layer_name("eth").and_then(|eth| {
        Some(LinkData {
            src_mac: meta_text(eth, "eth.src")?,
            dst_mac: meta_text(eth, "eth.dst")?,
        })
    });

    let ipv4 = packet.layer_name("ip").and_then(|ip| {
        Some(Ipv4Data {
            src: meta_text(ip, "ip.src")?,
            dst: meta_text(ip, "ip.dst")?,
            version: meta_int(ip, "ip.version"),
            ihl: meta_int(ip, "ip.hdr_len"),
            tos: meta_int(ip, "ip.dsfield"),
            len: meta_int(ip, "ip.len"),
            id: meta_int(ip, "ip.id"),
            frag: meta_int(ip, "ip.frag_offset"),
            ttl: meta_int(ip, "ip.ttl"),
            proto: meta_int(ip, "ip.proto"),
            chksum: meta_int(ip, "ip.checksum"),
        })
    });

    let transport = if let Some(tcp) = packet.layer_name("tcp") {
        Some(TransportData::Tcp {
            src_port: meta_int(tcp, "tcp.srcport"),
            dest_port: meta_int(tcp, "tcp.dstport"),
            seq: meta_int(tcp, "tcp.seq"),
            ack: meta_int(tcp, "tcp.ack"),
            dataofs: meta_int(tcp, "tcp.hdr_len"),
            reserved: meta_int(tcp, "tcp.flags.res"),
            window: meta_int(tcp, "tcp.window_size_value"),
            chksum: meta_int(tcp, "tcp.checksum"),
            urgptr: meta_int(tcp, "tcp.urgent_pointer"),
        })
    } else if let Some(udp) = packet.layer_name("udp") {
        Some(TransportData::Udp {
            src_port: meta_int(udp, "udp.srcport"),
            dest_port: meta_int(udp, "udp.dstport"),
            len: meta_int(udp, "udp.length"),
            chksum: meta_int(udp, "udp.checksum"),
        })
    } else {
        None
    };

    // Only HTTP response bodies count as a file payload.
    let http_payload = packet.layer_name("http").and_then(|http| {
        http.metadata("http.response")?;
        meta_text(http, "http.file_data")
    });

    RawFrame {
        frame_len,
        link,
        ipv4,
        transport,
        http_payload,
    }
}

/// Flattens one plucked frame into its feature record.
///
/// Returns None for frames without a link-layer header; those are treated as
/// corrupt and never reach the dataset.
pub fn frame_features(frame: &RawFrame) -> Option<FeatureRecord> {
    let link = frame.link.as_ref()?;

    let mut record = FeatureRecord::new();

    record.insert(
        "ether_src".to_string(),
        FeatureValue::Bool(address::is_authorized_mac_oui(oui_prefix(&link.src_mac))),
    );
    record.insert(
        "ether_dst".to_string(),
        FeatureValue::Bool(address::is_authorized_mac_oui(oui_prefix(&link.dst_mac))),
    );

    if let Some(ip) = &frame.ipv4 {
        insert_int(&mut record, "version", ip.version);
        insert_int(&mut record, "ihl", ip.ihl);
        insert_int(&mut record, "tos", ip.tos);
        insert_int(&mut record, "len", ip.len);
        insert_int(&mut record, "id", ip.id);
        insert_int(&mut record, "frag", ip.frag);
        insert_int(&mut record, "ttl", ip.ttl);
        insert_int(&mut record, "proto", ip.proto);
        insert_int(&mut record, "chksum", ip.chksum);
        record.insert(
            "is_src_ip_private".to_string(),
            FeatureValue::Bool(address::is_private_ip(&ip.src)),
        );
        record.insert(
            "is_dest_ip_private".to_string(),
            FeatureValue::Bool(address::is_private_ip(&ip.dst)),
        );
    }

    match &frame.transport {
        Some(TransportData::Tcp {
            src_port,
            dest_port,
            seq,
            ack,
            dataofs,
            reserved,
            window,
            chksum,
            urgptr,
        }) => {
            insert_int(&mut record, "src_port", *src_port);
            insert_int(&mut record, "dest_port", *dest_port);
            insert_int(&mut record, "seq", *seq);
            insert_int(&mut record, "ack", *ack);
            insert_int(&mut record, "dataofs", *dataofs);
            insert_int(&mut record, "reserved", *reserved);
            insert_int(&mut record, "window", *window);
            insert_int(&mut record, "tcp_chksum", *chksum);
            insert_int(&mut record, "urgptr", *urgptr);
        }
        Some(TransportData::Udp {
            src_port,
            dest_port,
            len,
            chksum,
        }) => {
            insert_int(&mut record, "src_port", *src_port);
            insert_int(&mut record, "dest_port", *dest_port);
            insert_int(&mut record, "udp_len", *len);
            insert_int(&mut record, "udp_chksum", *chksum);
        }
        None => {}
    }

    // The payload itself is discarded; only its presence is a feature.
    let has_payload = frame
        .http_payload
        .as_ref()
        .map_or(false, |payload| !payload.is_empty());

    record.insert(
        "packet_length".to_string(),
        FeatureValue::Int(frame.frame_len),
    );
    record.insert("has_file_payload".to_string(), FeatureValue::Bool(has_payload));

    Some(record)
}

/// The colon-separated OUI portion of a MAC address.
fn oui_prefix(mac: &str) -> &str {
    if mac.len() >= 8 {
        &mac[..8]
    } else {
        mac
    }
}

fn insert_int(record: &mut FeatureRecord, key: &str, value: Option<i64>) {
    if let Some(value) = value {
        record.insert(key.to_string(), FeatureValue::Int(value));
    }
}

fn meta_text(layer: &Layer, key: &str) -> Option<String> {
    layer.metadata(key).map(|meta| meta.value().to_string())
}

/// Reads a layer metadata value as an integer. tshark renders some header
/// fields (identification, checksums) as 0x-prefixed hex.
fn meta_int(layer: &Layer, key: &str) -> Option<i64> {
    parse_int(layer.metadata(key)?.value())
}

fn parse_int(value: &str) -> Option<i64> {
    match value.strip_prefix("0x") {
        Some(hex_digits) => i64::from_str_radix(hex_digits, 16).ok(),
        None => value.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tcp_frame() -> RawFrame {
        RawFrame {
            frame_len: 74,
            link: Some(LinkData {
                src_mac: "00:0c:29:4f:8e:35".to_string(),
                dst_mac: "de:ad:be:ef:00:01".to_string(),
            }),
            ipv4: Some(Ipv4Data {
                src: "10.0.0.5".to_string(),
                dst: "8.8.8.8".to_string(),
                version: Some(4),
                ihl: Some(20),
                tos: Some(0),
                len: Some(60),
                id: Some(0x1c46),
                frag: Some(0),
                ttl: Some(64),
                proto: Some(6),
                chksum: Some(0xb1e6),
            }),
            transport: Some(TransportData::Tcp {
                src_port: Some(49_522),
                dest_port: Some(443),
                seq: Some(0),
                ack: Some(0),
                dataofs: Some(40),
                reserved: Some(0),
                window: Some(29_200),
                chksum: Some(0x8e7c),
                urgptr: Some(0),
            }),
            http_payload: None,
        }
    }

    #[test]
    fn tcp_frame_features() {
        let record = frame_features(&tcp_frame()).unwrap();

        assert_eq!(record["is_src_ip_private"], FeatureValue::Bool(true));
        assert_eq!(record["is_dest_ip_private"], FeatureValue::Bool(false));
        assert_eq!(record["seq"], FeatureValue::Int(0));
        assert_eq!(record["ack"], FeatureValue::Int(0));
        assert_eq!(record["ttl"], FeatureValue::Int(64));
        assert!(!record.contains_key("udp_len"));
        assert!(!record.contains_key("udp_chksum"));
    }

    #[test]
    fn packet_length_equals_frame_length() {
        let record = frame_features(&tcp_frame()).unwrap();
        assert_eq!(record["packet_length"], FeatureValue::Int(74));
    }

    #[test]
    fn ether_booleans_come_from_oui_lookup() {
        let record = frame_features(&tcp_frame()).unwrap();
        assert_eq!(record["ether_src"], FeatureValue::Bool(true));
        assert_eq!(record["ether_dst"], FeatureValue::Bool(false));
    }

    #[test]
    fn frame_without_link_layer_is_dropped() {
        let mut frame = tcp_frame();
        frame.link = None;
        assert!(frame_features(&frame).is_none());
    }

    #[test]
    fn udp_frame_has_no_tcp_keys() {
        let mut frame = tcp_frame();
        frame.transport = Some(TransportData::Udp {
            src_port: Some(5353),
            dest_port: Some(5353),
            len: Some(120),
            chksum: Some(0x1234),
        });

        let record = frame_features(&frame).unwrap();
        assert_eq!(record["udp_len"], FeatureValue::Int(120));
        assert!(!record.contains_key("seq"));
        assert!(!record.contains_key("ack"));
        assert!(!record.contains_key("window"));
    }

    #[test]
    fn missing_network_layer_emits_no_ip_keys() {
        let mut frame = tcp_frame();
        frame.ipv4 = None;
        frame.transport = None;

        let record = frame_features(&frame).unwrap();
        assert!(!record.contains_key("ttl"));
        assert!(!record.contains_key("is_src_ip_private"));
        assert!(!record.contains_key("src_port"));
        // Common fields survive regardless of detected layers.
        assert_eq!(record["packet_length"], FeatureValue::Int(74));
        assert_eq!(record["has_file_payload"], FeatureValue::Bool(false));
    }

    #[test]
    fn http_response_payload_sets_flag_only() {
        let mut frame = tcp_frame();
        frame.http_payload = Some("HTTP body bytes".to_string());

        let record = frame_features(&frame).unwrap();
        assert_eq!(record["has_file_payload"], FeatureValue::Bool(true));
        // The payload bytes themselves never reach the record.
        assert!(!record.values().any(|v| v == &FeatureValue::Text("HTTP body bytes".to_string())));
    }

    #[test]
    fn empty_payload_does_not_set_flag() {
        let mut frame = tcp_frame();
        frame.http_payload = Some(String::new());
        let record = frame_features(&frame).unwrap();
        assert_eq!(record["has_file_payload"], FeatureValue::Bool(false));
    }

    #[test]
    fn parse_int_accepts_hex_and_decimal() {
        assert_eq!(parse_int("64"), Some(64));
        assert_eq!(parse_int("0x1c46"), Some(0x1c46));
        assert_eq!(parse_int("garbage"), None);
    }

    #[test]
    fn short_mac_does_not_panic() {
        let mut frame = tcp_frame();
        frame.link = Some(LinkData {
            src_mac: "00:0c".to_string(),
            dst_mac: "00:0c:29:4f:8e:35".to_string(),
        });
        assert!(frame_features(&frame).is_some());
    }
}
