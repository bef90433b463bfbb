//! Report assembly and the external JSON contract

use std::cmp::Ordering;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::classify::VulnerabilityKind;
use crate::registry::{cipher_display_name, group_display_name};
use crate::session::TlsSession;

/// Terminal artifact of an analyze() call, immutable once built
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub analysis_metadata: AnalysisMetadata,
    pub vulnerability_summary: VulnerabilitySummary,
    pub sessions: Vec<SessionReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisMetadata {
    /// Report generation time
    pub timestamp: String,
    pub total_sessions: usize,
    pub vulnerable_sessions: usize,
}

/// Sessions carrying each vulnerability kind (session counts, not events)
#[derive(Debug, Clone, Default, Serialize)]
pub struct VulnerabilitySummary {
    pub export_grade_ciphers: usize,
    pub rc4_ciphers: usize,
    pub weak_dh_parameters: usize,
    pub export_cipher_offered: usize,
    pub rc4_cipher_offered: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub session_id: String,
    pub timestamp: String,
    pub timestamp_unix: f64,
    pub connection: Connection,
    pub cipher_suites: CipherSuites,
    pub diffie_hellman: DiffieHellman,
    pub vulnerabilities: Vec<VulnerabilityKind>,
    pub is_vulnerable: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Connection {
    pub src_ip: String,
    pub src_port: u16,
    pub dst_ip: String,
    pub dst_port: u16,
}

#[derive(Debug, Clone, Serialize)]
pub struct CipherSuites {
    pub client_offered: Vec<CipherEntry>,
    pub server_selected: Option<CipherEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CipherEntry {
    /// `0xHHHH`, lowercase hex
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiffieHellman {
    pub supported_groups: Vec<u16>,
    pub named_groups: Vec<String>,
    pub prime_size_bits: Option<u32>,
}

impl CipherEntry {
    fn new(id: u16) -> Self {
        Self {
            id: format!("0x{:04x}", id),
            name: cipher_display_name(id),
        }
    }
}

/// ISO-8601 timestamp with Z suffix for a unix epoch time
fn iso8601(unix: f64) -> String {
    let secs = unix.trunc() as i64;
    let nanos = (unix.fract() * 1e9) as u32;
    DateTime::<Utc>::from_timestamp(secs, nanos)
        .unwrap_or_else(Utc::now)
        .to_rfc3339_opts(SecondsFormat::Micros, true)
}

impl SessionReport {
    fn from_session(session: &TlsSession) -> Self {
        let named_groups = session
            .dh_groups
            .iter()
            .map(|&g| group_display_name(g))
            .collect();

        Self {
            session_id: session.session_id.clone(),
            timestamp: iso8601(session.timestamp),
            timestamp_unix: session.timestamp,
            connection: Connection {
                src_ip: session.src_ip.clone(),
                src_port: session.src_port,
                dst_ip: session.dst_ip.clone(),
                dst_port: session.dst_port,
            },
            cipher_suites: CipherSuites {
                client_offered: session.client_ciphers.iter().map(|&c| CipherEntry::new(c)).collect(),
                server_selected: session.server_cipher.map(CipherEntry::new),
            },
            diffie_hellman: DiffieHellman {
                supported_groups: session.dh_groups.clone(),
                named_groups,
                prime_size_bits: session.dh_prime_size,
            },
            vulnerabilities: session.vulnerabilities.clone(),
            is_vulnerable: !session.vulnerabilities.is_empty(),
        }
    }
}

/// Build the report from classified sessions
///
/// Sessions are sorted by `(timestamp, session_id)` so output never depends
/// on map iteration order.
pub fn build_report(mut sessions: Vec<TlsSession>) -> Report {
    sessions.sort_by(|a, b| {
        a.timestamp
            .partial_cmp(&b.timestamp)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.session_id.cmp(&b.session_id))
    });

    let mut summary = VulnerabilitySummary::default();
    for session in &sessions {
        for kind in &session.vulnerabilities {
            match kind {
                VulnerabilityKind::ExportGradeCipher => summary.export_grade_ciphers += 1,
                VulnerabilityKind::Rc4Cipher => summary.rc4_ciphers += 1,
                VulnerabilityKind::WeakDhParameters => summary.weak_dh_parameters += 1,
                VulnerabilityKind::ExportCipherOffered => summary.export_cipher_offered += 1,
                VulnerabilityKind::Rc4CipherOffered => summary.rc4_cipher_offered += 1,
            }
        }
    }

    let vulnerable = sessions
        .iter()
        .filter(|s| !s.vulnerabilities.is_empty())
        .count();

    Report {
        analysis_metadata: AnalysisMetadata {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            total_sessions: sessions.len(),
            vulnerable_sessions: vulnerable,
        },
        vulnerability_summary: summary,
        sessions: sessions.iter().map(SessionReport::from_session).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify;
    use crate::session::SessionStore;

    fn session(
        ts: f64,
        src_port: u16,
        ciphers: &[u16],
        selected: Option<u16>,
        dh_bits: Option<u32>,
    ) -> TlsSession {
        let mut store = SessionStore::new();
        let s = store.get_or_create(ts, "10.0.0.1", src_port, "10.0.0.2", 443);
        s.client_ciphers = ciphers.to_vec();
        s.server_cipher = selected;
        s.dh_prime_size = dh_bits;
        let mut s = store.into_sessions().remove(0);
        s.vulnerabilities = classify(&s);
        s
    }

    #[test]
    fn test_sessions_sorted_by_time_then_id() {
        let report = build_report(vec![
            session(200.0, 40002, &[0x002F], None, None),
            session(100.0, 40001, &[0x002F], None, None),
            session(100.0, 40000, &[0x002F], None, None),
        ]);

        let ids: Vec<&str> = report.sessions.iter().map(|s| s.session_id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "10.0.0.1:40000-10.0.0.2:443",
                "10.0.0.1:40001-10.0.0.2:443",
                "10.0.0.1:40002-10.0.0.2:443",
            ]
        );
    }

    #[test]
    fn test_summary_counts_sessions_not_events() {
        // One session offering two RC4 suites still counts once.
        let report = build_report(vec![
            session(1.0, 40000, &[0x0004, 0x0005], Some(0x0004), None),
            session(2.0, 40001, &[0x002F], Some(0x002F), Some(512)),
        ]);

        assert_eq!(report.vulnerability_summary.rc4_ciphers, 1);
        assert_eq!(report.vulnerability_summary.rc4_cipher_offered, 1);
        assert_eq!(report.vulnerability_summary.weak_dh_parameters, 1);
        assert_eq!(report.vulnerability_summary.export_grade_ciphers, 0);
        assert_eq!(report.analysis_metadata.total_sessions, 2);
        assert_eq!(report.analysis_metadata.vulnerable_sessions, 2);
    }

    #[test]
    fn test_json_contract_shape() {
        let report = build_report(vec![session(
            100.5,
            40000,
            &[0x0003, 0x1301],
            Some(0x0003),
            Some(512),
        )]);
        let value = serde_json::to_value(&report).unwrap();

        let meta = &value["analysis_metadata"];
        assert!(meta["timestamp"].as_str().unwrap().ends_with('Z'));
        assert_eq!(meta["total_sessions"], 1);
        assert_eq!(meta["vulnerable_sessions"], 1);

        let summary = &value["vulnerability_summary"];
        assert_eq!(summary["export_grade_ciphers"], 1);
        assert_eq!(summary["rc4_ciphers"], 1);
        assert_eq!(summary["weak_dh_parameters"], 1);
        assert_eq!(summary["export_cipher_offered"], 1);
        assert_eq!(summary["rc4_cipher_offered"], 1);

        let s = &value["sessions"][0];
        assert_eq!(s["session_id"], "10.0.0.1:40000-10.0.0.2:443");
        assert_eq!(s["timestamp_unix"], 100.5);
        assert_eq!(s["connection"]["src_port"], 40000);
        assert_eq!(s["cipher_suites"]["client_offered"][0]["id"], "0x0003");
        assert_eq!(
            s["cipher_suites"]["client_offered"][0]["name"],
            "TLS_RSA_EXPORT_WITH_RC4_40_MD5"
        );
        assert_eq!(s["cipher_suites"]["client_offered"][1]["name"], "UNKNOWN_0x1301");
        assert_eq!(s["cipher_suites"]["server_selected"]["id"], "0x0003");
        assert_eq!(s["diffie_hellman"]["prime_size_bits"], 512);
        assert_eq!(s["is_vulnerable"], true);
        assert!(s["vulnerabilities"]
            .as_array()
            .unwrap()
            .contains(&serde_json::json!("EXPORT_GRADE_CIPHER")));
    }

    #[test]
    fn test_clean_session_not_vulnerable() {
        let report = build_report(vec![session(1.0, 40000, &[0x002F], Some(0x002F), None)]);
        assert_eq!(report.analysis_metadata.vulnerable_sessions, 0);
        assert!(!report.sessions[0].is_vulnerable);
        assert!(report.sessions[0].vulnerabilities.is_empty());
    }

    #[test]
    fn test_server_selected_null_when_absent() {
        let report = build_report(vec![session(1.0, 40000, &[0x002F], None, None)]);
        let value = serde_json::to_value(&report).unwrap();
        assert!(value["sessions"][0]["cipher_suites"]["server_selected"].is_null());
    }

    #[test]
    fn test_iso8601_format() {
        let ts = iso8601(0.0);
        assert_eq!(ts, "1970-01-01T00:00:00.000000Z");
    }
}
