//! Per-connection replay sessions and the accept loop.

mod handshake;
pub(crate) mod prepared;

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::codec;
use crate::error::{Error, Result};
use crate::matcher::{self, MatchOutcome};
use crate::mock::MockStore;
use crate::net::{BufferedSocket, Socket, TlsUpgrade};
use crate::options::ReplayOptions;
use crate::protocol::Message;

/// Pause between idle-read retries.
const IDLE_BACKOFF: Duration = Duration::from_millis(50);

/// One logical task per client connection: handshake once, then the
/// command loop until the client quits, disconnects, or something fatal
/// happens.
#[derive(Clone)]
pub struct ReplaySession {
    store: Arc<dyn MockStore>,
    options: ReplayOptions,
    tls: Option<Arc<dyn TlsUpgrade>>,
    cancel: CancellationToken,
}

impl ReplaySession {
    pub fn new(store: Arc<dyn MockStore>, options: ReplayOptions) -> Self {
        Self {
            store,
            options,
            tls: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Install the TLS collaborator; without one, SSL upgrades are refused.
    pub fn with_tls(mut self, tls: Arc<dyn TlsUpgrade>) -> Self {
        self.tls = Some(tls);
        self
    }

    /// Tie all blocking operations to an external cancellation token.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Accept connections forever, one spawned session per client. Ends
    /// when cancelled or when the listener fails.
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        let counts = self.store.get_mysql_counts().await;
        info!(
            total = counts.total,
            config = counts.config,
            data = counts.data,
            "serving mysql replay"
        );

        loop {
            let accepted = tokio::select! {
                _ = self.cancel.cancelled() => return Ok(()),
                accepted = listener.accept() => accepted?,
            };

            let (stream, peer) = accepted;
            let session = self.clone();

            tokio::spawn(async move {
                match session.run(stream).await {
                    Ok(()) => debug!(%peer, "replay session closed"),
                    Err(error) => debug!(%peer, %error, "replay session failed"),
                }
            });
        }
    }

    /// Replay one client connection over any socket (tests drive this with
    /// an in-memory duplex).
    pub async fn run<S>(self, stream: S) -> Result<()>
    where
        S: Socket + 'static,
    {
        let conn = BufferedSocket::new(Box::new(stream));

        let counts = self.store.get_mysql_counts().await;
        debug!(
            total = counts.total,
            config = counts.config,
            data = counts.data,
            "starting replay session"
        );

        let (mut conn, mut ctx) = tokio::select! {
            _ = self.cancel.cancelled() => return Err(Error::Cancelled),
            done = handshake::simulate(
                conn,
                &*self.store,
                self.tls.as_ref(),
                self.options.tls_backdate,
            ) => done?,
        };

        debug!("handshake complete, entering command phase");

        let deadline = self.options.read_deadline();

        loop {
            let next = tokio::select! {
                _ = self.cancel.cancelled() => return Err(Error::Cancelled),
                next = conn.read_packet_timeout(deadline) => next,
            };

            let (header, payload) = match next {
                Ok(Some(frame)) => frame,
                // clean EOF: the client hung up between commands
                Ok(None) => return Ok(()),
                Err(Error::ReadTimeout) => {
                    tokio::time::sleep(IDLE_BACKOFF).await;
                    continue;
                }
                Err(error) => return Err(error),
            };

            let request = codec::decode_payload(&mut ctx, header, payload)?;

            let replies = match matcher::match_command(&mut ctx, &*self.store, &request).await? {
                MatchOutcome::Quit => return Ok(()),
                MatchOutcome::Replies(replies) => replies,
            };

            // the close refers to the live id the client sent, which is the
            // runtime id this engine handed out
            if let Message::StmtClose(close) = &request.message {
                ctx.remove_statement(close.statement_id);
            }

            if request.message.is_no_response() {
                continue;
            }

            for reply in &replies {
                let frame = codec::encode_packet(reply, &ctx);

                // no write retries: a failed write means the client is gone
                conn.write_all(&frame).await?;
                ctx.note_sent(&reply.message);
            }
        }
    }
}
