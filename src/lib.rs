//! Offline TLS handshake security analyzer
//!
//! Ingests a captured pcap, correlates handshake messages into bidirectional
//! sessions, and reports cryptographic weaknesses: export-grade ciphers, RC4
//! ciphers, and undersized Diffie-Hellman parameters.
//!
//! Two backends populate the same session representation: field extraction
//! through an external tshark process, and direct packet parsing with a
//! manual byte-level fallback. `analyze` drives the whole pipeline.

pub mod backend;
pub mod classify;
pub mod error;
pub mod registry;
pub mod report;
pub mod session;
pub mod tls;

use std::path::Path;

use tracing::{debug, info, warn};

use backend::{CaptureBackend, TsharkBackend};
use session::SessionStore;

pub use backend::BackendChoice;
pub use classify::VulnerabilityKind;
pub use error::{AnalyzerError, Result};
pub use report::Report;
pub use session::TlsSession;

/// Analyze a capture file and build the vulnerability report
///
/// Backend failures are never fatal: a backend that cannot run contributes
/// zero sessions, and `Auto` falls back from tshark to capture parsing when
/// tshark is unavailable, fails, or finds nothing. The session store lives
/// only for this call.
pub fn analyze(path: &Path, choice: BackendChoice) -> Report {
    let store = match choice {
        BackendChoice::ExternalTool => run_tshark(path),
        BackendChoice::CaptureLibrary => run_capture(path),
        BackendChoice::Auto => {
            let tshark = TsharkBackend::new();
            if tshark.is_available() {
                let store = run_tshark(path);
                if store.is_empty() {
                    debug!("tshark yielded no sessions, falling back to capture parsing");
                    run_capture(path)
                } else {
                    store
                }
            } else {
                debug!("tshark not available, using capture backend");
                run_capture(path)
            }
        }
    };

    let mut sessions = store.into_sessions();
    info!("analyzed {}: {} sessions", path.display(), sessions.len());

    // Classification runs exactly once per session, after the backend has
    // seen every packet.
    for session in &mut sessions {
        session.vulnerabilities = classify::classify(session);
    }

    report::build_report(sessions)
}

fn run_tshark(path: &Path) -> SessionStore {
    let mut store = SessionStore::new();
    let backend = TsharkBackend::new();
    if let Err(e) = backend.run(path, &mut store) {
        warn!("tshark backend failed: {}", e);
        return SessionStore::new();
    }
    store
}

fn run_capture(path: &Path) -> SessionStore {
    let mut store = SessionStore::new();
    let backend = CaptureBackend::new();
    if let Err(e) = backend.run(path, &mut store) {
        // Sessions folded before the failure are kept.
        warn!("capture backend failed: {}", e);
    }
    store
}
