//! Listener configuration.
//!
//! Raw settings (typically from the command line) are validated into a
//! [`ListenerConfig`] before any socket is opened, so a half-specified TLS
//! setup fails fast instead of surfacing mid-handshake.

use std::path::PathBuf;

use thiserror::Error;

/// Default listening port.
pub const DEFAULT_PORT: u16 = 4040;

/// Rejected configuration input.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// TLS was enabled without the settings it requires.
    #[error("TLS is enabled but no {0} was provided")]
    IncompleteTls(&'static str),
}

/// TLS settings for the listening socket.
///
/// The core never terminates TLS itself; an external acceptor wraps the
/// accepted stream. `Enabled` can only be constructed with both pieces
/// present.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TlsSettings {
    /// Serve plaintext.
    Disabled,
    /// Hand these to the transport acceptor.
    Enabled {
        /// Path to the certificate bundle.
        cert_path: PathBuf,
        /// Password protecting the certificate.
        password: String,
    },
}

/// Validated listener configuration.
#[derive(Clone, Debug)]
pub struct ListenerConfig {
    /// Port to listen on.
    pub port: u16,
    /// TLS settings for the transport acceptor.
    pub tls: TlsSettings,
    /// Directory raw messages are dumped to; `None` disables persistence.
    pub dump_dir: Option<PathBuf>,
}

impl ListenerConfig {
    /// Validate raw settings into a configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::IncompleteTls`] when TLS is requested without
    /// both a certificate path and a password.
    pub fn new(
        port: u16,
        tls_enabled: bool,
        tls_cert: Option<PathBuf>,
        tls_password: Option<String>,
        dump_dir: Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let tls = if tls_enabled {
            match (tls_cert, tls_password) {
                (Some(cert_path), Some(password)) => TlsSettings::Enabled {
                    cert_path,
                    password,
                },
                (None, _) => return Err(ConfigError::IncompleteTls("certificate path")),
                (_, None) => return Err(ConfigError::IncompleteTls("certificate password")),
            }
        } else {
            TlsSettings::Disabled
        };
        Ok(Self {
            port,
            tls,
            dump_dir,
        })
    }
}
