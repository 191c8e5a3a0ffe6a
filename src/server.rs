//! TCP listener bootstrap.
//!
//! Accepts connections and spawns one [`ConnectionSession`] task per peer.
//! The accept loop watches for Ctrl+C and stops taking new connections when
//! it fires; in-flight sessions run to completion on their own tasks.

use std::{
    io,
    net::{SocketAddr, TcpListener as StdTcpListener},
    sync::Arc,
};

use tokio::{
    net::TcpListener,
    time::{Duration, sleep},
};
use tracing::{info, warn};

use crate::{pipeline::MessagePipeline, session::ConnectionSession};

/// Tokio-based MLLP listener.
pub struct MllpServer {
    listener: TcpListener,
    pipeline: Arc<MessagePipeline>,
}

impl MllpServer {
    /// Bind to `addr` and prepare to serve connections through `pipeline`.
    ///
    /// # Errors
    ///
    /// Returns an [`io::Error`] if binding fails.
    pub fn bind(addr: SocketAddr, pipeline: Arc<MessagePipeline>) -> io::Result<Self> {
        let std_listener = StdTcpListener::bind(addr)?;
        std_listener.set_nonblocking(true)?;
        let listener = TcpListener::from_std(std_listener)?;
        Ok(Self { listener, pipeline })
    }

    /// Address the listener is bound to; useful when binding port 0.
    ///
    /// # Errors
    ///
    /// Returns an [`io::Error`] if the local address cannot be determined.
    pub fn local_addr(&self) -> io::Result<SocketAddr> { self.listener.local_addr() }

    /// Accept connections until a shutdown signal is received.
    ///
    /// Transient accept errors back off exponentially, capped at one second,
    /// and reset on the next successful accept.
    ///
    /// # Errors
    ///
    /// Returns an [`io::Error`] if installing the Ctrl+C handler fails.
    pub async fn run(self) -> io::Result<()> {
        info!(addr = %self.local_addr()?, "listener started");
        let mut delay = Duration::from_millis(10);
        loop {
            tokio::select! {
                res = self.listener.accept() => match res {
                    Ok((stream, peer)) => {
                        delay = Duration::from_millis(10);
                        let pipeline = Arc::clone(&self.pipeline);
                        tokio::spawn(async move {
                            // The session logs its own outcome, including
                            // transport faults; nothing more to do here.
                            let _ = ConnectionSession::new(stream, peer.to_string(), pipeline)
                                .run()
                                .await;
                        });
                    }
                    Err(err) => {
                        warn!(%err, "accept failed");
                        sleep(delay).await;
                        delay = (delay * 2).min(Duration::from_secs(1));
                    }
                },
                res = tokio::signal::ctrl_c() => {
                    res?;
                    info!("shutdown signal received; no longer accepting connections");
                    return Ok(());
                }
            }
        }
    }
}
