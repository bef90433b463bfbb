//! TLS session accumulation and bidirectional flow correlation

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::classify::VulnerabilityKind;

/// Canonical bidirectional flow key
///
/// Both directions of a TCP connection must resolve to the same key, so the
/// two `ip:port` endpoint strings are joined in lexicographically sorted
/// order.
pub fn flow_key(src_ip: &str, src_port: u16, dst_ip: &str, dst_port: u16) -> String {
    let a = format!("{}:{}", src_ip, src_port);
    let b = format!("{}:{}", dst_ip, dst_port);
    if a <= b {
        format!("{}-{}", a, b)
    } else {
        format!("{}-{}", b, a)
    }
}

/// Accumulated handshake facts for one bidirectional flow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TlsSession {
    pub session_id: String,
    /// Capture time of the first packet observed for this flow
    pub timestamp: f64,
    pub src_ip: String,
    pub dst_ip: String,
    pub src_port: u16,
    pub dst_port: u16,
    /// Cipher suites offered in the ClientHello, insertion order preserved
    pub client_ciphers: Vec<u16>,
    /// Cipher suite selected in the ServerHello, last write wins
    pub server_cipher: Option<u16>,
    /// Named groups advertised in the supported_groups extension
    pub dh_groups: Vec<u16>,
    /// DH prime bit length from a ServerKeyExchange, when observed
    pub dh_prime_size: Option<u32>,
    /// Populated by the classifier only, never by parsing
    pub vulnerabilities: Vec<VulnerabilityKind>,
}

impl TlsSession {
    fn new(session_id: String, timestamp: f64, src_ip: &str, src_port: u16, dst_ip: &str, dst_port: u16) -> Self {
        Self {
            session_id,
            timestamp,
            src_ip: src_ip.to_string(),
            dst_ip: dst_ip.to_string(),
            src_port,
            dst_port,
            client_ciphers: Vec::new(),
            server_cipher: None,
            dh_groups: Vec::new(),
            dh_prime_size: None,
            vulnerabilities: Vec::new(),
        }
    }
}

/// Session storage keyed by canonical flow key
///
/// Lives for the duration of one analyze() call. Both backends populate it
/// through `get_or_create` so key derivation stays in one place.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: HashMap<String, TlsSession>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or lazily create the session for a flow
    ///
    /// The first call for a key fixes the endpoint metadata and timestamp;
    /// later calls return the existing session unchanged in identity.
    pub fn get_or_create(
        &mut self,
        timestamp: f64,
        src_ip: &str,
        src_port: u16,
        dst_ip: &str,
        dst_port: u16,
    ) -> &mut TlsSession {
        let key = flow_key(src_ip, src_port, dst_ip, dst_port);
        self.sessions.entry(key.clone()).or_insert_with(|| {
            TlsSession::new(key, timestamp, src_ip, src_port, dst_ip, dst_port)
        })
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn into_sessions(self) -> Vec<TlsSession> {
        self.sessions.into_values().collect()
    }
}
