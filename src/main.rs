//! MLLP listener binary.
//!
//! Parses CLI arguments, validates the configuration, wires the shared
//! collaborators together, and serves until interrupted.

mod cli;

use std::{
    net::{Ipv4Addr, SocketAddr},
    process::ExitCode,
    sync::Arc,
};

use clap::Parser;
use hl7_listener::{
    config::{ListenerConfig, TlsSettings},
    hl7::PipeDelimitedCodec,
    hub::BroadcastHub,
    persist::{Discard, FileDump, MessageSink},
    pipeline::MessagePipeline,
    server::MllpServer,
    store::MessageStore,
};
use tracing::error;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let cli = cli::Cli::parse();
    let config = match ListenerConfig::new(
        cli.port,
        cli.tls,
        cli.tls_cert,
        cli.tls_password,
        cli.dump_dir,
    ) {
        Ok(config) => config,
        Err(err) => {
            error!(%err, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };
    if let TlsSettings::Enabled { .. } = config.tls {
        // TLS termination belongs to an external acceptor wrapped around the
        // accepted stream; this binary serves plaintext only.
        error!("this build does not terminate TLS; run behind a TLS acceptor");
        return ExitCode::FAILURE;
    }

    let sink: Arc<dyn MessageSink> = match &config.dump_dir {
        Some(dir) => Arc::new(FileDump::new(dir.clone())),
        None => Arc::new(Discard),
    };
    let pipeline = Arc::new(MessagePipeline::new(
        Arc::new(PipeDelimitedCodec::default()),
        sink,
        Arc::new(MessageStore::new()),
        Arc::new(BroadcastHub::new()),
    ));

    let addr = SocketAddr::new(Ipv4Addr::UNSPECIFIED.into(), config.port);
    let server = match MllpServer::bind(addr, pipeline) {
        Ok(server) => server,
        Err(err) => {
            error!(%err, port = config.port, "failed to bind listener");
            return ExitCode::FAILURE;
        }
    };
    match server.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "listener failed");
            ExitCode::FAILURE
        }
    }
}
