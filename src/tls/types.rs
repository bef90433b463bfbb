//! TLS record and handshake protocol types

use serde::{Deserialize, Serialize};

/// TLS record content types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsRecordType {
    ChangeCipherSpec,
    Alert,
    Handshake,
    ApplicationData,
    Heartbeat,
    Unknown(u8),
}

impl From<u8> for TlsRecordType {
    fn from(val: u8) -> Self {
        match val {
            20 => TlsRecordType::ChangeCipherSpec,
            21 => TlsRecordType::Alert,
            22 => TlsRecordType::Handshake,
            23 => TlsRecordType::ApplicationData,
            24 => TlsRecordType::Heartbeat,
            other => TlsRecordType::Unknown(other),
        }
    }
}

/// TLS handshake message types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsHandshakeType {
    ClientHello,
    ServerHello,
    Certificate,
    ServerKeyExchange,
    ServerHelloDone,
    ClientKeyExchange,
    Finished,
    Unknown(u8),
}

impl From<u8> for TlsHandshakeType {
    fn from(val: u8) -> Self {
        match val {
            1 => TlsHandshakeType::ClientHello,
            2 => TlsHandshakeType::ServerHello,
            11 => TlsHandshakeType::Certificate,
            12 => TlsHandshakeType::ServerKeyExchange,
            14 => TlsHandshakeType::ServerHelloDone,
            16 => TlsHandshakeType::ClientKeyExchange,
            20 => TlsHandshakeType::Finished,
            other => TlsHandshakeType::Unknown(other),
        }
    }
}

/// A handshake fact decoded from one TLS record
///
/// Only the three message types that carry security-relevant fields are
/// tracked; everything else decodes to no fact at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HandshakeFact {
    ClientHello {
        /// Offered cipher suite IDs, source byte order preserved
        ciphers: Vec<u16>,
        /// Named groups from the supported_groups extension
        groups: Vec<u16>,
    },
    ServerHello {
        /// Selected cipher suite ID
        cipher: u16,
    },
    ServerKeyExchange {
        /// Bit length of the explicit DH prime, when one was declared
        dh_prime_size_bits: Option<u32>,
    },
}
