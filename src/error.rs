use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pcap read error: {0}")]
    Pcap(#[from] pcap_file::PcapError),

    #[error("tshark exited with status {status}: {stderr}")]
    ToolFailed { status: i32, stderr: String },

    #[error("tool output decode error: {0}")]
    ToolOutput(#[from] std::string::FromUtf8Error),
}

pub type Result<T> = std::result::Result<T, AnalyzerError>;
