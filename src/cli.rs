use anyhow::{bail, Context, Result};
use clap::Parser;
use colored::Colorize;
use std::fs::File;
use std::path::PathBuf;

use tlsaudit::BackendChoice;

#[derive(Parser)]
#[command(name = "tlsaudit")]
#[command(version, about = "Analyze pcap files for TLS security vulnerabilities")]
pub struct Cli {
    /// Path to the pcap file to analyze
    pub pcap: PathBuf,

    /// Output report path
    #[arg(short, long, default_value = "report.json")]
    pub output: PathBuf,

    /// Analysis backend
    #[arg(short, long, value_enum, default_value_t = BackendChoice::Auto)]
    pub method: BackendChoice,

    /// Enable debug logging
    #[arg(short, long)]
    pub debug: bool,
}

pub fn run_command(cli: Cli) -> Result<()> {
    if !cli.pcap.exists() {
        bail!("pcap file not found: {}", cli.pcap.display());
    }

    let report = tlsaudit::analyze(&cli.pcap, cli.method);

    let file = File::create(&cli.output)
        .with_context(|| format!("cannot write report to {}", cli.output.display()))?;
    serde_json::to_writer_pretty(file, &report).context("failed to serialize report")?;

    let meta = &report.analysis_metadata;
    println!("Report generated: {}", cli.output.display());
    println!("  Sessions:   {}", meta.total_sessions);
    if meta.vulnerable_sessions > 0 {
        println!(
            "  Vulnerable: {}",
            meta.vulnerable_sessions.to_string().red().bold()
        );
    } else {
        println!("  Vulnerable: {}", "0".green());
    }

    Ok(())
}
