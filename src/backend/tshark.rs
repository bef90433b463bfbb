//! External-tool backend: tshark field extraction
//!
//! Runs tshark over the capture with a fixed field list and folds the
//! tab-separated output rows into the session store. This backend trusts
//! tshark's own TLS decoding and never touches the manual parser.

use std::path::Path;
use std::process::Command;

use tracing::{debug, warn};

use crate::error::{AnalyzerError, Result};
use crate::registry::cipher_id_from_name;
use crate::session::SessionStore;
use crate::tls::HandshakeFact;

use super::{fold_fact, PacketMeta};

/// Display filter matching ClientHello, ServerHello and ServerKeyExchange
const HANDSHAKE_FILTER: &str =
    "tls.handshake.type == 1 || tls.handshake.type == 2 || tls.handshake.type == 12";

/// Extracted fields, one tab-separated column each; multi-valued fields are
/// comma-joined by the aggregator
const FIELDS: &[&str] = &[
    "frame.time_epoch",
    "ip.src",
    "ip.dst",
    "tcp.srcport",
    "tcp.dstport",
    "tls.handshake.type",
    "tls.handshake.ciphersuite",
    "tls.handshake.cipher",
    "tls.handshake.extensions_supported_group",
];

pub struct TsharkBackend {
    binary: String,
}

impl TsharkBackend {
    pub fn new() -> Self {
        Self {
            binary: "tshark".to_string(),
        }
    }

    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Exit-code probe for the tshark binary
    pub fn is_available(&self) -> bool {
        Command::new(&self.binary)
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    /// Extract handshake fields from the capture and fold them into the store
    pub fn run(&self, path: &Path, store: &mut SessionStore) -> Result<()> {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("-r")
            .arg(path)
            .args(["-Y", HANDSHAKE_FILTER])
            .args(["-T", "fields"])
            .args(["-E", "separator=/t"])
            .args(["-E", "aggregator=,"]);
        for field in FIELDS {
            cmd.args(["-e", field]);
        }

        debug!("running {} on {}", self.binary, path.display());
        let output = cmd.output()?;

        if !output.status.success() {
            return Err(AnalyzerError::ToolFailed {
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8(output.stdout)?;
        for line in stdout.lines() {
            fold_line(line, store);
        }
        Ok(())
    }
}

impl Default for TsharkBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Fold one tshark output row into the store
///
/// Rows with fewer fields than the fixed prefix are skipped, never fatal.
fn fold_line(line: &str, store: &mut SessionStore) {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < 6 {
        if !line.trim().is_empty() {
            warn!("skipping short tshark row: {} fields", fields.len());
        }
        return;
    }

    let timestamp = match fields[0].trim().parse::<f64>() {
        Ok(t) => t,
        Err(_) => return,
    };
    let src_ip = fields[1].trim();
    let dst_ip = fields[2].trim();
    if src_ip.is_empty() || dst_ip.is_empty() {
        return;
    }
    let (src_port, dst_port) = match (fields[3].trim().parse(), fields[4].trim().parse()) {
        (Ok(s), Ok(d)) => (s, d),
        _ => return,
    };

    let meta = PacketMeta {
        timestamp,
        src_ip: src_ip.to_string(),
        dst_ip: dst_ip.to_string(),
        src_port,
        dst_port,
    };

    // One record can carry several handshake messages; the type column is
    // then a comma-joined list.
    let types: Vec<&str> = fields[5].split(',').map(str::trim).collect();

    if types.contains(&"1") {
        let ciphers = fields
            .get(6)
            .map(|f| {
                f.split(',')
                    .filter_map(parse_cipher_token)
                    .collect::<Vec<u16>>()
            })
            .unwrap_or_default();
        let groups = fields
            .get(8)
            .map(|f| {
                f.split(',')
                    .filter_map(parse_numeric_token)
                    .collect::<Vec<u16>>()
            })
            .unwrap_or_default();
        fold_fact(store, &meta, HandshakeFact::ClientHello { ciphers, groups });
    } else if types.contains(&"2") {
        let selected = fields
            .get(7)
            .and_then(|f| f.split(',').next())
            .and_then(parse_cipher_token);
        if let Some(cipher) = selected {
            fold_fact(store, &meta, HandshakeFact::ServerHello { cipher });
        }
    }
    // Type 12 rows are matched by the filter but carry no DH prime field;
    // DH extraction is a capture-backend capability.
}

/// Resolve a cipher token: `0x`-prefixed hex, decimal, or IANA name
///
/// Unresolvable tokens are dropped silently.
fn parse_cipher_token<S: AsRef<str>>(token: S) -> Option<u16> {
    let t = token.as_ref().trim();
    if t.is_empty() {
        return None;
    }
    if let Some(hex) = t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
        return u16::from_str_radix(hex, 16).ok();
    }
    if let Ok(v) = t.parse::<u16>() {
        return Some(v);
    }
    cipher_id_from_name(t)
}

/// Resolve a numeric token in hex or decimal form
fn parse_numeric_token<S: AsRef<str>>(token: S) -> Option<u16> {
    let t = token.as_ref().trim();
    if t.is_empty() {
        return None;
    }
    if let Some(hex) = t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
        return u16::from_str_radix(hex, 16).ok();
    }
    t.parse::<u16>().ok()
}
