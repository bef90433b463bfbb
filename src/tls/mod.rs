//! Manual TLS record and handshake decoding
//!
//! Used by the capture backend both as a fallback when tls-parser cannot
//! interpret a payload and for ServerKeyExchange parameter blocks.

pub mod parser;
pub mod types;

pub use parser::{
    parse_client_hello, parse_handshake, parse_server_hello, parse_server_key_exchange,
    parse_tls_record, record_span,
};
pub use types::{HandshakeFact, TlsHandshakeType, TlsRecordType};
