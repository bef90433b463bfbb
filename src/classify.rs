//! Vulnerability classification rules

use serde::{Deserialize, Serialize};

use crate::registry::{is_export_cipher, is_rc4_cipher};
use crate::session::TlsSession;

/// Weakest acceptable DH prime size in bits
const MIN_DH_PRIME_BITS: u32 = 1024;

/// Classified weaknesses of a TLS session
///
/// "Offered" kinds are derived from the ClientHello cipher list independent
/// of what the server selected; the other three come from the selected
/// cipher or the DH prime size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VulnerabilityKind {
    ExportCipherOffered,
    ExportGradeCipher,
    Rc4Cipher,
    Rc4CipherOffered,
    WeakDhParameters,
}

impl VulnerabilityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VulnerabilityKind::ExportCipherOffered => "EXPORT_CIPHER_OFFERED",
            VulnerabilityKind::ExportGradeCipher => "EXPORT_GRADE_CIPHER",
            VulnerabilityKind::Rc4Cipher => "RC4_CIPHER",
            VulnerabilityKind::Rc4CipherOffered => "RC4_CIPHER_OFFERED",
            VulnerabilityKind::WeakDhParameters => "WEAK_DH_PARAMETERS",
        }
    }
}

/// Apply the classification rules to a fully populated session
///
/// All matching kinds are emitted, sorted and deduplicated. Must run exactly
/// once per session, after every packet has been processed.
pub fn classify(session: &TlsSession) -> Vec<VulnerabilityKind> {
    let mut kinds = Vec::new();

    // Offered flags come from the full offered list, which necessarily
    // includes any selected cipher.
    if session.client_ciphers.iter().any(|&c| is_export_cipher(c)) {
        kinds.push(VulnerabilityKind::ExportCipherOffered);
    }
    if session.client_ciphers.iter().any(|&c| is_rc4_cipher(c)) {
        kinds.push(VulnerabilityKind::Rc4CipherOffered);
    }

    if let Some(selected) = session.server_cipher {
        if is_export_cipher(selected) {
            kinds.push(VulnerabilityKind::ExportGradeCipher);
        }
        if is_rc4_cipher(selected) {
            kinds.push(VulnerabilityKind::Rc4Cipher);
        }
    }

    if let Some(bits) = session.dh_prime_size {
        if bits < MIN_DH_PRIME_BITS {
            kinds.push(VulnerabilityKind::WeakDhParameters);
        }
    }

    kinds.sort();
    kinds.dedup();
    kinds
}
