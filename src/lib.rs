//! MySQL wire-protocol replay engine.
//!
//! During recording (elsewhere in the toolchain), traffic between an
//! application and a real MySQL server is captured into a library of mock
//! artifacts. This crate is the replay half: the application connects to a
//! proxy socket as if it were MySQL, and the engine reconstructs a
//! behaviorally indistinguishable session purely from those mocks — the
//! connection-phase handshake (fast auth, full auth with the public-key
//! exchange, TLS upgrade, plugin switch) and the command phase, with live
//! commands matched semantically against the recordings even though
//! statement ids and salts differ between runs.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use mysql_replay::{InMemoryMockStore, ReplayOptions, ReplaySession};
//! use tokio::net::TcpListener;
//!
//! # async fn example(mocks: Vec<mysql_replay::Mock>) -> mysql_replay::Result<()> {
//! let store = Arc::new(InMemoryMockStore::new(mocks));
//! let listener = TcpListener::bind("127.0.0.1:3306").await?;
//!
//! ReplaySession::new(store, ReplayOptions::default())
//!     .serve(listener)
//!     .await
//! # }
//! ```

#[macro_use]
pub mod error;

pub mod codec;
pub mod io;
mod matcher;
pub mod mock;
pub mod net;
pub mod options;
pub mod protocol;
pub mod session;

pub use codec::{ConnContext, Mode};
pub use error::{Error, Result};
pub use mock::{InMemoryMockStore, Mock, MockCounts, MockKind, MockStore, MockType};
pub use net::{BufferedSocket, Socket, TlsUpgrade};
pub use options::ReplayOptions;
pub use session::ReplaySession;
