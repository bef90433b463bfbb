//! Byte-level TLS handshake parser
//!
//! Stateless decoding of TLS records and the three handshake messages that
//! carry security-relevant fields. Truncated input is never an error: each
//! read is bounds-checked and parsing stops at the first missing field,
//! keeping whatever was already decoded.

use super::types::{HandshakeFact, TlsHandshakeType, TlsRecordType};

/// supported_groups extension type
const EXT_SUPPORTED_GROUPS: u16 = 10;

/// Total byte span of the record starting at `data`, if a header is present
pub fn record_span(data: &[u8]) -> Option<usize> {
    if data.len() < 5 {
        return None;
    }
    Some(5 + u16::from_be_bytes([data[3], data[4]]) as usize)
}

/// Decode one TLS record believed to start at `data`
///
/// Returns a fact only for complete handshake records; anything else
/// (other content types, bad version, declared length past the buffer)
/// is not a fact this parser tracks.
pub fn parse_tls_record(data: &[u8]) -> Option<HandshakeFact> {
    if data.len() < 5 {
        return None;
    }
    if TlsRecordType::from(data[0]) != TlsRecordType::Handshake {
        return None;
    }
    let version = u16::from_be_bytes([data[1], data[2]]);
    if !(0x0300..=0x0304).contains(&version) {
        return None;
    }
    let length = u16::from_be_bytes([data[3], data[4]]) as usize;
    if data.len() < 5 + length {
        return None;
    }
    parse_handshake(&data[5..5 + length])
}

/// Decode a handshake message header and dispatch on its type
pub fn parse_handshake(body: &[u8]) -> Option<HandshakeFact> {
    if body.len() < 4 {
        return None;
    }
    let msg_type = TlsHandshakeType::from(body[0]);
    let declared = u32::from_be_bytes([0, body[1], body[2], body[3]]) as usize;
    let end = (4 + declared).min(body.len());
    let msg = &body[4..end];

    match msg_type {
        TlsHandshakeType::ClientHello => Some(parse_client_hello(msg)),
        TlsHandshakeType::ServerHello => parse_server_hello(msg),
        TlsHandshakeType::ServerKeyExchange => Some(parse_server_key_exchange(msg)),
        _ => None,
    }
}

/// Decode a ClientHello body: offered cipher suites plus the
/// supported_groups extension
///
/// Layout: version(2) random(32) session_id(1+n) cipher_suites(2+n)
/// compression(1+n) extensions(2+n). Truncation at any point returns the
/// fields decoded so far.
pub fn parse_client_hello(body: &[u8]) -> HandshakeFact {
    let mut ciphers = Vec::new();
    let mut groups = Vec::new();

    // version + random
    let mut offset = 34;
    if offset >= body.len() {
        return HandshakeFact::ClientHello { ciphers, groups };
    }
    let session_id_len = body[offset] as usize;
    offset += 1 + session_id_len;

    if offset + 2 > body.len() {
        return HandshakeFact::ClientHello { ciphers, groups };
    }
    let cipher_list_len = u16::from_be_bytes([body[offset], body[offset + 1]]) as usize;
    offset += 2;

    let mut i = 0;
    while i + 2 <= cipher_list_len && offset + i + 2 <= body.len() {
        ciphers.push(u16::from_be_bytes([body[offset + i], body[offset + i + 1]]));
        i += 2;
    }
    if offset + cipher_list_len > body.len() {
        return HandshakeFact::ClientHello { ciphers, groups };
    }
    offset += cipher_list_len;

    if offset >= body.len() {
        return HandshakeFact::ClientHello { ciphers, groups };
    }
    let compression_len = body[offset] as usize;
    offset += 1 + compression_len;

    if offset + 2 > body.len() {
        return HandshakeFact::ClientHello { ciphers, groups };
    }
    let extensions_len = u16::from_be_bytes([body[offset], body[offset + 1]]) as usize;
    offset += 2;

    let extensions_end = (offset + extensions_len).min(body.len());
    while offset + 4 <= extensions_end {
        let ext_type = u16::from_be_bytes([body[offset], body[offset + 1]]);
        let ext_len = u16::from_be_bytes([body[offset + 2], body[offset + 3]]) as usize;
        offset += 4;
        if offset + ext_len > extensions_end {
            break;
        }
        if ext_type == EXT_SUPPORTED_GROUPS {
            groups = parse_groups(&body[offset..offset + ext_len]);
        }
        offset += ext_len;
    }

    HandshakeFact::ClientHello { ciphers, groups }
}

fn parse_groups(data: &[u8]) -> Vec<u16> {
    let mut groups = Vec::new();
    if data.len() < 2 {
        return groups;
    }
    let list_len = u16::from_be_bytes([data[0], data[1]]) as usize;
    let mut i = 2;
    while i + 2 <= 2 + list_len && i + 2 <= data.len() {
        groups.push(u16::from_be_bytes([data[i], data[i + 1]]));
        i += 2;
    }
    groups
}

/// Decode a ServerHello body to the selected cipher suite
///
/// Same fixed prefix as ClientHello; without the two cipher bytes there is
/// nothing to report.
pub fn parse_server_hello(body: &[u8]) -> Option<HandshakeFact> {
    let mut offset = 34;
    if offset >= body.len() {
        return None;
    }
    let session_id_len = body[offset] as usize;
    offset += 1 + session_id_len;

    if offset + 2 > body.len() {
        return None;
    }
    let cipher = u16::from_be_bytes([body[offset], body[offset + 1]]);
    Some(HandshakeFact::ServerHello { cipher })
}

/// Decode a ServerKeyExchange body to the DH prime bit length
///
/// Only explicit-prime parameter blocks (type 0) are modeled. The prime size
/// is committed from the declared length alone; generator and public value
/// are commonly cut short in minimal captures and carry no fact of their own.
/// The declared length is not validated against the remaining buffer.
pub fn parse_server_key_exchange(body: &[u8]) -> HandshakeFact {
    if body.is_empty() || body[0] != 0 {
        return HandshakeFact::ServerKeyExchange {
            dh_prime_size_bits: None,
        };
    }
    if body.len() < 3 {
        return HandshakeFact::ServerKeyExchange {
            dh_prime_size_bits: None,
        };
    }
    let prime_len = u16::from_be_bytes([body[1], body[2]]) as u32;
    HandshakeFact::ServerKeyExchange {
        dh_prime_size_bits: Some(prime_len * 8),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a ClientHello record with the given ciphers and groups
    fn make_client_hello(ciphers: &[u16], groups: &[u16]) -> Vec<u8> {
        let mut body = vec![0x03, 0x03]; // version
        body.extend_from_slice(&[0u8; 32]); // random
        body.push(0); // session id length

        body.extend_from_slice(&((ciphers.len() * 2) as u16).to_be_bytes());
        for c in ciphers {
            body.extend_from_slice(&c.to_be_bytes());
        }

        body.push(1); // compression methods
        body.push(0); // null compression

        let mut ext = Vec::new();
        if !groups.is_empty() {
            ext.extend_from_slice(&10u16.to_be_bytes()); // supported_groups
            ext.extend_from_slice(&((groups.len() * 2 + 2) as u16).to_be_bytes());
            ext.extend_from_slice(&((groups.len() * 2) as u16).to_be_bytes());
            for g in groups {
                ext.extend_from_slice(&g.to_be_bytes());
            }
        }
        body.extend_from_slice(&(ext.len() as u16).to_be_bytes());
        body.extend_from_slice(&ext);

        wrap_record(1, &body)
    }

    fn make_server_hello(cipher: u16) -> Vec<u8> {
        let mut body = vec![0x03, 0x03];
        body.extend_from_slice(&[0u8; 32]);
        body.push(0);
        body.extend_from_slice(&cipher.to_be_bytes());
        body.push(0); // compression
        wrap_record(2, &body)
    }

    fn make_server_key_exchange(prime: &[u8]) -> Vec<u8> {
        let mut body = vec![0x00]; // explicit prime params
        body.extend_from_slice(&(prime.len() as u16).to_be_bytes());
        body.extend_from_slice(prime);
        body.extend_from_slice(&1u16.to_be_bytes()); // generator length
        body.push(2); // generator
        wrap_record(12, &body)
    }

    /// Wrap a handshake message body in handshake + record headers
    fn wrap_record(msg_type: u8, body: &[u8]) -> Vec<u8> {
        let mut hs = vec![msg_type];
        hs.extend_from_slice(&(body.len() as u32).to_be_bytes()[1..]);
        hs.extend_from_slice(body);

        let mut rec = vec![22, 0x03, 0x03];
        rec.extend_from_slice(&(hs.len() as u16).to_be_bytes());
        rec.extend_from_slice(&hs);
        rec
    }

    #[test]
    fn test_client_hello_ciphers_in_order() {
        let rec = make_client_hello(&[0x0003, 0x002F, 0xC030, 0x0005], &[]);
        match parse_tls_record(&rec) {
            Some(HandshakeFact::ClientHello { ciphers, .. }) => {
                assert_eq!(ciphers, vec![0x0003, 0x002F, 0xC030, 0x0005]);
            }
            other => panic!("unexpected fact: {:?}", other),
        }
    }

    #[test]
    fn test_client_hello_supported_groups() {
        let rec = make_client_hello(&[0x002F], &[23, 256, 24]);
        match parse_tls_record(&rec) {
            Some(HandshakeFact::ClientHello { ciphers, groups }) => {
                assert_eq!(ciphers, vec![0x002F]);
                assert_eq!(groups, vec![23, 256, 24]);
            }
            other => panic!("unexpected fact: {:?}", other),
        }
    }

    #[test]
    fn test_client_hello_duplicate_ciphers_kept() {
        let rec = make_client_hello(&[0x0005, 0x0005], &[]);
        match parse_tls_record(&rec) {
            Some(HandshakeFact::ClientHello { ciphers, .. }) => {
                assert_eq!(ciphers, vec![0x0005, 0x0005]);
            }
            other => panic!("unexpected fact: {:?}", other),
        }
    }

    #[test]
    fn test_server_hello_selected_cipher() {
        let rec = make_server_hello(0x0004);
        assert_eq!(
            parse_tls_record(&rec),
            Some(HandshakeFact::ServerHello { cipher: 0x0004 })
        );
    }

    #[test]
    fn test_server_key_exchange_prime_bits() {
        let rec = make_server_key_exchange(&[0xFF; 64]);
        assert_eq!(
            parse_tls_record(&rec),
            Some(HandshakeFact::ServerKeyExchange {
                dh_prime_size_bits: Some(512)
            })
        );

        let rec = make_server_key_exchange(&[0xFF; 256]);
        assert_eq!(
            parse_tls_record(&rec),
            Some(HandshakeFact::ServerKeyExchange {
                dh_prime_size_bits: Some(2048)
            })
        );
    }

    #[test]
    fn test_server_key_exchange_truncated_generator() {
        // Prime length declared and present, generator cut off entirely.
        let mut body = vec![0x00];
        body.extend_from_slice(&64u16.to_be_bytes());
        body.extend_from_slice(&[0xAA; 64]);
        assert_eq!(
            parse_server_key_exchange(&body),
            HandshakeFact::ServerKeyExchange {
                dh_prime_size_bits: Some(512)
            }
        );
    }

    #[test]
    fn test_server_key_exchange_lenient_length() {
        // Declared prime length far larger than the buffer: the claimed
        // size is still recorded.
        let body = vec![0x00, 0x10, 0x00]; // 4096-byte prime, no prime bytes
        assert_eq!(
            parse_server_key_exchange(&body),
            HandshakeFact::ServerKeyExchange {
                dh_prime_size_bits: Some(32768)
            }
        );
    }

    #[test]
    fn test_server_key_exchange_non_explicit_prime() {
        // Named-curve params (type 3) are not modeled.
        let body = vec![0x03, 0x00, 0x17];
        assert_eq!(
            parse_server_key_exchange(&body),
            HandshakeFact::ServerKeyExchange {
                dh_prime_size_bits: None
            }
        );
    }

    #[test]
    fn test_record_wrong_content_type() {
        let rec = make_client_hello(&[0x002F], &[]);
        let mut app_data = rec.clone();
        app_data[0] = 23;
        assert_eq!(parse_tls_record(&app_data), None);
    }

    #[test]
    fn test_record_declared_length_past_buffer() {
        let mut rec = make_client_hello(&[0x002F], &[]);
        let len = rec.len();
        rec.truncate(len - 1);
        assert_eq!(parse_tls_record(&rec), None);
    }

    #[test]
    fn test_record_bad_version() {
        let mut rec = make_client_hello(&[0x002F], &[]);
        rec[1] = 0x07;
        assert_eq!(parse_tls_record(&rec), None);
    }

    #[test]
    fn test_untracked_handshake_type() {
        // Certificate (11) decodes to no fact.
        let rec = wrap_record(11, &[0x00, 0x00, 0x00]);
        assert_eq!(parse_tls_record(&rec), None);
    }

    #[test]
    fn test_truncated_client_hello_keeps_partial_ciphers() {
        // Full headers but the cipher list is cut mid-way through the
        // third suite: the first two must survive.
        let mut body = vec![0x03, 0x03];
        body.extend_from_slice(&[0u8; 32]);
        body.push(0);
        body.extend_from_slice(&6u16.to_be_bytes()); // declares 3 suites
        body.extend_from_slice(&0x0003u16.to_be_bytes());
        body.extend_from_slice(&0x002Fu16.to_be_bytes());
        body.push(0xC0); // half of the third suite

        match parse_client_hello(&body) {
            HandshakeFact::ClientHello { ciphers, groups } => {
                assert_eq!(ciphers, vec![0x0003, 0x002F]);
                assert!(groups.is_empty());
            }
            other => panic!("unexpected fact: {:?}", other),
        }
    }

    #[test]
    fn test_truncation_never_panics() {
        let samples = [
            make_client_hello(&[0x0003, 0x002F], &[23]),
            make_server_hello(0x0005),
            make_server_key_exchange(&[0xFF; 64]),
        ];
        for sample in &samples {
            for cut in 0..sample.len() {
                let _ = parse_tls_record(&sample[..cut]);
                if cut >= 5 {
                    let _ = parse_handshake(&sample[5..cut]);
                }
            }
        }
    }

    #[test]
    fn test_truncated_server_hello_no_fact() {
        // Headers only, cipher bytes missing.
        let mut body = vec![0x03, 0x03];
        body.extend_from_slice(&[0u8; 32]);
        body.push(0);
        assert_eq!(parse_server_hello(&body), None);
    }

    #[test]
    fn test_record_span() {
        let rec = make_server_hello(0x002F);
        assert_eq!(record_span(&rec), Some(rec.len()));
        assert_eq!(record_span(&[22, 3, 3]), None);
    }
}
