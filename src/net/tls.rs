use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;
use crate::net::Socket;

/// The TLS collaborator contract.
///
/// The engine never manufactures certificates; when a client asks for an
/// SSL upgrade, the connection is handed to this trait and comes back as an
/// encrypted stream. `backdate` tells the collaborator how far back to date
/// the certificate it mints.
#[async_trait]
pub trait TlsUpgrade: Send + Sync {
    /// Peek-based detection: does this read-ahead look like a TLS
    /// client hello?
    fn is_tls_handshake(&self, prefix: &[u8]) -> bool;

    /// Accept the TLS handshake on `stream`. `buffered` carries bytes the
    /// engine already read off the socket; they belong to the handshake and
    /// must be replayed to the TLS layer first.
    async fn upgrade(
        &self,
        stream: Box<dyn Socket>,
        buffered: Bytes,
        backdate: Duration,
    ) -> Result<Box<dyn Socket>>;
}
