pub mod pb;

use anyhow::{Context, Result};
use std::path::Path;
use tonic::transport::{Certificate, Channel, ClientTlsConfig, Endpoint};

/// Connects a gRPC channel to the node's RPC endpoint over TLS, mirroring how
/// the ambient stack's own client authenticates (certificate + bearer
/// credential attached per call rather than baked into the channel).
pub async fn connect(uri: &str, tls_cert_path: &Path) -> Result<Channel> {
    let pem = std::fs::read(tls_cert_path)
        .with_context(|| format!("reading TLS cert at {}", tls_cert_path.display()))?;
    let ca = Certificate::from_pem(pem);
    let tls = ClientTlsConfig::new().ca_certificate(ca);

    let endpoint = Endpoint::from_shared(uri.to_string())
        .with_context(|| format!("invalid node RPC endpoint {}", uri))?
        .tls_config(tls)
        .context("configuring TLS for node RPC endpoint")?;

    endpoint
        .connect()
        .await
        .with_context(|| format!("connecting to node RPC endpoint {}", uri))
}
