//! Analysis backends
//!
//! Two interchangeable strategies populate the session store: field
//! extraction through an external tshark process, and direct parsing of the
//! captured packets. Both fold handshake facts through the same function so
//! the resulting sessions are identical regardless of backend.

pub mod capture;
pub mod tshark;

use clap::ValueEnum;

use crate::session::SessionStore;
use crate::tls::HandshakeFact;

pub use capture::CaptureBackend;
pub use tshark::TsharkBackend;

/// Backend selection for an analyze() call
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendChoice {
    /// tshark first, capture parsing if it yields nothing
    Auto,
    /// External tshark field extraction only
    #[value(name = "tshark")]
    ExternalTool,
    /// pcap parsing only
    #[value(name = "capture")]
    CaptureLibrary,
}

/// Endpoint metadata of the packet a fact was decoded from
#[derive(Debug, Clone)]
pub struct PacketMeta {
    pub timestamp: f64,
    pub src_ip: String,
    pub dst_ip: String,
    pub src_port: u16,
    pub dst_port: u16,
}

/// Fold one handshake fact into the session for its flow
///
/// Shared by both backends and both decode paths of the capture backend.
pub fn fold_fact(store: &mut SessionStore, meta: &PacketMeta, fact: HandshakeFact) {
    let session = store.get_or_create(
        meta.timestamp,
        &meta.src_ip,
        meta.src_port,
        &meta.dst_ip,
        meta.dst_port,
    );

    match fact {
        HandshakeFact::ClientHello { ciphers, groups } => {
            session.client_ciphers.extend(ciphers);
            if !groups.is_empty() {
                session.dh_groups = groups;
            }
        }
        HandshakeFact::ServerHello { cipher } => {
            session.server_cipher = Some(cipher);
        }
        HandshakeFact::ServerKeyExchange { dh_prime_size_bits } => {
            if let Some(bits) = dh_prime_size_bits {
                session.dh_prime_size = Some(bits);
            }
        }
    }
}
