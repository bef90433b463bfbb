//! Capture backend: direct pcap parsing
//!
//! Reads the capture with pcap-file, slices link/IP/TCP layers with
//! etherparse, and walks the TLS records in each TCP payload. Records go
//! through tls-parser first; when it cannot interpret the bytes the manual
//! parser takes over. Facts from either path fold identically.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use etherparse::{NetSlice, SlicedPacket, TransportSlice};
use pcap_file::pcap::PcapReader;
use tls_parser::{
    parse_tls_client_hello_extensions, parse_tls_plaintext, TlsExtension, TlsMessage,
    TlsMessageHandshake,
};
use tracing::{debug, warn};

use crate::error::Result;
use crate::session::SessionStore;
use crate::tls::{self, HandshakeFact};

use super::{fold_fact, PacketMeta};

pub struct CaptureBackend;

impl CaptureBackend {
    pub fn new() -> Self {
        Self
    }

    /// Process every packet in the capture into the store
    pub fn run(&self, path: &Path, store: &mut SessionStore) -> Result<()> {
        let file = File::open(path)?;
        let mut reader = PcapReader::new(BufReader::new(file))?;

        let mut packets = 0u64;
        while let Some(next) = reader.next_packet() {
            let packet = match next {
                Ok(p) => p,
                Err(e) => {
                    // Keep the sessions accumulated so far.
                    warn!("pcap read aborted after {} packets: {}", packets, e);
                    break;
                }
            };
            packets += 1;
            let timestamp = packet.timestamp.as_secs_f64();
            process_packet(&packet.data, timestamp, store);
        }

        debug!("capture backend: {} packets, {} sessions", packets, store.len());
        Ok(())
    }
}

impl Default for CaptureBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode one captured frame and fold any handshake facts it carries
///
/// Packets without both IP endpoints and TCP ports cannot be correlated and
/// are skipped, as is anything yielding no fact.
fn process_packet(data: &[u8], timestamp: f64, store: &mut SessionStore) {
    let sliced = match SlicedPacket::from_ethernet(data) {
        Ok(s) => s,
        // Raw-IP captures carry no link layer.
        Err(_) => match SlicedPacket::from_ip(data) {
            Ok(s) => s,
            Err(_) => return,
        },
    };

    let (src_ip, dst_ip) = match &sliced.net {
        Some(NetSlice::Ipv4(v4)) => (
            v4.header().source_addr().to_string(),
            v4.header().destination_addr().to_string(),
        ),
        Some(NetSlice::Ipv6(v6)) => (
            v6.header().source_addr().to_string(),
            v6.header().destination_addr().to_string(),
        ),
        _ => return,
    };

    let (src_port, dst_port, payload) = match &sliced.transport {
        Some(TransportSlice::Tcp(tcp)) => {
            (tcp.source_port(), tcp.destination_port(), tcp.payload())
        }
        _ => return,
    };
    if payload.is_empty() {
        return;
    }

    let meta = PacketMeta {
        timestamp,
        src_ip,
        dst_ip,
        src_port,
        dst_port,
    };
    for fact in extract_facts(payload) {
        fold_fact(store, &meta, fact);
    }
}

/// Walk consecutive TLS records in a TCP payload and collect facts
///
/// tls-parser handles each record when it can; the manual parser covers the
/// rest. A payload that is not TLS at all yields nothing.
fn extract_facts(payload: &[u8]) -> Vec<HandshakeFact> {
    let mut facts = Vec::new();
    let mut cursor = payload;

    while cursor.len() >= 5 {
        // Plausibility of the record header before trusting its length.
        if !(20..=24).contains(&cursor[0]) {
            break;
        }
        let version = u16::from_be_bytes([cursor[1], cursor[2]]);
        if !(0x0300..=0x0304).contains(&version) {
            break;
        }
        let span = match tls::record_span(cursor) {
            Some(s) if s <= cursor.len() => s,
            // Fewer bytes than the record declares: no fact.
            _ => break,
        };

        let record = &cursor[..span];
        match library_facts(record) {
            Some(decoded) => facts.extend(decoded),
            None => {
                if let Some(fact) = tls::parse_tls_record(record) {
                    facts.push(fact);
                }
            }
        }
        cursor = &cursor[span..];
    }

    facts
}

/// Decode one record through tls-parser's typed TLS layer
///
/// `None` means the library could not interpret the record (or it carries no
/// tracked message) and the manual parser should have a look.
fn library_facts(record: &[u8]) -> Option<Vec<HandshakeFact>> {
    let (_, plaintext) = parse_tls_plaintext(record).ok()?;

    let mut facts = Vec::new();
    for msg in &plaintext.msg {
        let handshake = match msg {
            TlsMessage::Handshake(hs) => hs,
            _ => continue,
        };
        match handshake {
            TlsMessageHandshake::ClientHello(content) => {
                let ciphers = content.ciphers.iter().map(|c| c.0).collect();
                let mut groups = Vec::new();
                if let Some(ext_data) = content.ext {
                    if let Ok((_, extensions)) = parse_tls_client_hello_extensions(ext_data) {
                        for ext in &extensions {
                            if let TlsExtension::EllipticCurves(named) = ext {
                                groups = named.iter().map(|g| g.0).collect();
                            }
                        }
                    }
                }
                facts.push(HandshakeFact::ClientHello { ciphers, groups });
            }
            TlsMessageHandshake::ServerHello(content) => {
                facts.push(HandshakeFact::ServerHello {
                    cipher: content.cipher.0,
                });
            }
            TlsMessageHandshake::ServerKeyExchange(content) => {
                // tls-parser leaves the parameter block opaque; the manual
                // parser owns its interpretation.
                facts.push(tls::parse_server_key_exchange(content.parameters));
            }
            _ => {}
        }
    }

    if facts.is_empty() {
        None
    } else {
        Some(facts)
    }
}
