//! PostgreSQL connection handling with SSL/TLS support.

use crate::profiles::ConnectionProfile;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::DigitallySignedStruct;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("PostgreSQL connection failed: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[error("TLS configuration error: {0}")]
    Tls(String),

    #[error("unsupported sslmode '{0}'")]
    UnknownSslMode(String),
}

/// Certificate verifier that accepts any certificate (sslmode=require)
#[derive(Debug)]
struct NoVerifier;

impl ServerCertVerifier for NoVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        vec![
            rustls::SignatureScheme::RSA_PKCS1_SHA256,
            rustls::SignatureScheme::RSA_PKCS1_SHA384,
            rustls::SignatureScheme::RSA_PKCS1_SHA512,
            rustls::SignatureScheme::ECDSA_NISTP256_SHA256,
            rustls::SignatureScheme::ECDSA_NISTP384_SHA384,
            rustls::SignatureScheme::ECDSA_NISTP521_SHA512,
            rustls::SignatureScheme::RSA_PSS_SHA256,
            rustls::SignatureScheme::RSA_PSS_SHA384,
            rustls::SignatureScheme::RSA_PSS_SHA512,
            rustls::SignatureScheme::ED25519,
        ]
    }
}

/// SSL connection mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SslMode {
    None,
    Verified,
    Insecure,
}

/// `prefer` and unset: encrypted first, plaintext only as a last resort.
const TLS_FIRST: &[SslMode] = &[SslMode::Verified, SslMode::Insecure, SslMode::None];
/// `allow`: plaintext first.
const PLAIN_FIRST: &[SslMode] = &[SslMode::None, SslMode::Verified, SslMode::Insecure];

impl SslMode {
    pub const fn label(&self) -> &'static str {
        match self {
            Self::None => "No TLS",
            Self::Verified => "SSL",
            Self::Insecure => "SSL (unverified)",
        }
    }

    /// Modes to attempt, in order, for a profile's `sslmode` value.
    /// Without one TLS is tried first, plaintext last.
    pub fn candidates(sslmode: Option<&str>) -> Result<&'static [SslMode], ConnectionError> {
        match sslmode.map(str::trim) {
            None | Some("" | "prefer") => Ok(TLS_FIRST),
            Some("allow") => Ok(PLAIN_FIRST),
            Some("disable") => Ok(&[SslMode::None]),
            Some("verify-ca" | "verify-full") => Ok(&[SslMode::Verified]),
            Some("require") => Ok(&[SslMode::Verified, SslMode::Insecure]),
            Some(other) => Err(ConnectionError::UnknownSslMode(other.to_string())),
        }
    }
}

/// Spawn the connection handler task
fn spawn_connection<S, T>(connection: tokio_postgres::Connection<S, T>)
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send + 'static,
    T: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            warn!("PostgreSQL connection closed with error: {e}");
        }
    });
}

fn build_tls_config(verify_server: bool) -> rustls::ClientConfig {
    if verify_server {
        let mut root_store = rustls::RootCertStore::empty();
        root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        rustls::ClientConfig::builder()
            .with_root_certificates(root_store)
            .with_no_client_auth()
    } else {
        rustls::ClientConfig::builder()
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(NoVerifier))
            .with_no_client_auth()
    }
}

/// Try to connect with a specific SSL mode
pub async fn try_connect(
    pg_config: &tokio_postgres::Config,
    ssl_mode: SslMode,
) -> Result<tokio_postgres::Client, ConnectionError> {
    match ssl_mode {
        SslMode::None => {
            let (client, connection) = pg_config.connect(tokio_postgres::NoTls).await?;
            spawn_connection(connection);
            Ok(client)
        }
        SslMode::Verified | SslMode::Insecure => {
            let tls_config = build_tls_config(ssl_mode == SslMode::Verified);
            let tls = tokio_postgres_rustls::MakeRustlsConnect::new(tls_config);
            let (client, connection) = pg_config.connect(tls).await?;
            spawn_connection(connection);
            Ok(client)
        }
    }
}

/// Connect to `profile`, walking its candidate SSL modes until one succeeds.
pub async fn connect(
    profile: &ConnectionProfile,
) -> Result<(tokio_postgres::Client, SslMode), ConnectionError> {
    let pg_config = profile.pg_config();
    let mut last_error = None;

    for &mode in SslMode::candidates(profile.sslmode.as_deref())? {
        debug!(profile = %profile.name, mode = mode.label(), "connecting");
        match try_connect(&pg_config, mode).await {
            Ok(client) => {
                info!(profile = %profile.name, target = %profile.label(), mode = mode.label(), "connected");
                return Ok((client, mode));
            }
            Err(e) => {
                debug!(mode = mode.label(), error = %e, "connection attempt failed");
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| ConnectionError::Tls("no connection mode available".into())))
}
