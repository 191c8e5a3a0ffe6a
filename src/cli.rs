//! Command line interface for the `hl7-listener` binary.
//!
//! This module is also included by the build script to generate the man
//! page, so it must stand alone apart from `clap`.

use std::path::PathBuf;

use clap::Parser;

/// Command line arguments for the `hl7-listener` binary.
#[derive(Debug, Parser)]
#[command(name = "hl7-listener", version, about = "MLLP listener for HL7 messages")]
pub struct Cli {
    /// Port to listen on.
    #[arg(short, long, default_value_t = 4040)]
    pub port: u16,

    /// Enable TLS on the listening socket.
    #[arg(long)]
    pub tls: bool,

    /// Path to the TLS certificate bundle. Required with --tls.
    #[arg(long)]
    pub tls_cert: Option<PathBuf>,

    /// Password protecting the TLS certificate. Required with --tls.
    #[arg(long)]
    pub tls_password: Option<String>,

    /// Directory raw messages are dumped to. Omit to disable persistence.
    #[arg(long)]
    pub dump_dir: Option<PathBuf>,
}
