//! Error and Result types.

use std::io;

/// A specialized `Result` type for the replay engine.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// All the ways a replay session can fail.
///
/// The engine never writes a synthetic MySQL error packet back to the
/// client; every variant below terminates the connection (or, for
/// [`Error::ReadTimeout`], lets the command loop idle) and is surfaced to
/// the caller for logging.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Error communicating with the client socket.
    #[error("error communicating with the client: {0}")]
    Io(#[from] io::Error),

    /// Unexpected or malformed data on the wire. Fatal for the connection.
    #[error("protocol error: {0}")]
    Protocol(Box<str>),

    /// The connection phase could not be reconstructed from the config mocks.
    #[error("handshake failed: {0}")]
    Handshake(Box<str>),

    /// The unfiltered mock set is empty; there is nothing left to match.
    #[error("no mysql mocks available to match against")]
    NoMocks,

    /// No recorded mock matched a command that requires one.
    #[error("no mock matched the {request} request")]
    NoMatch { request: Box<str> },

    /// Another session consumed the chosen mock first.
    #[error("mock {mock} was consumed by a concurrent session")]
    ConsumeRace { mock: Box<str> },

    /// An error occurred during the TLS upgrade.
    #[error("error during TLS upgrade: {0}")]
    Tls(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// No packet arrived within the read deadline. Benign; the command
    /// loop backs off and rearms the deadline.
    #[error("read timed out waiting for the next client packet")]
    ReadTimeout,

    /// The surrounding context was cancelled.
    #[error("session cancelled")]
    Cancelled,
}

macro_rules! err_protocol {
    ($($args:tt)*) => {
        $crate::error::Error::Protocol(format!($($args)*).into())
    };
}

macro_rules! err_handshake {
    ($($args:tt)*) => {
        $crate::error::Error::Handshake(format!($($args)*).into())
    };
}
