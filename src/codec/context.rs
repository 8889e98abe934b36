use std::collections::HashMap;

use crate::protocol::auth::AuthPlugin;
use crate::protocol::connect::Handshake;
use crate::protocol::statement::ComStmtPrepareOk;
use crate::protocol::{Capabilities, Message};

/// Synthetic "last operation" tags. Which message a client payload decodes
/// to depends on what the engine last sent, so the context tracks one of
/// these (or, in the command phase, the last command byte).
pub(crate) mod last_op {
    /// Greeting sent; expecting `SSLRequest` or `HandshakeResponse41`.
    pub const GREETING_SENT: u8 = 0x0a;

    /// Auth-switch request sent; expecting an opaque `AuthSwitchResponse`.
    pub const AUTH_SWITCH_SENT: u8 = 0xfe;

    /// `PerformFullAuthentication` sent; expecting a public-key request
    /// (plaintext connections) or the cleartext password (TLS).
    pub const FULL_AUTH_REQUESTED: u8 = 0x04;

    /// Server public key sent; expecting the RSA-encrypted password.
    pub const PUBLIC_KEY_SENT: u8 = 0x02;

    /// Authentication finished; expecting commands.
    pub const COMMAND_PHASE: u8 = 0x00;
}

/// The engine only replays; recording runs elsewhere in the toolchain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Replay,
}

/// Per-connection decode state, owned by the session and passed into every
/// codec and matcher call.
#[derive(Debug)]
pub struct ConnContext {
    pub mode: Mode,

    /// Tag of the last operation on this connection; drives payload
    /// disambiguation (see [`last_op`]).
    pub last_op: u8,

    /// The greeting replayed at handshake, kept for post-mortem logging and
    /// for the server capability set.
    pub greeting: Option<Handshake>,

    pub server_capabilities: Capabilities,

    /// Capabilities from the *recorded* handshake response of the matched
    /// config mock; govern how replies are re-encoded.
    pub recorded_client_capabilities: Capabilities,

    /// Capabilities the live client actually sent.
    pub client_capabilities: Capabilities,

    pub auth_plugin: AuthPlugin,

    pub use_ssl: bool,

    /// Runtime statement id -> prepare response (as sent to the client).
    prepared_statements: HashMap<u32, ComStmtPrepareOk>,

    /// Runtime statement id -> prepared query text.
    statement_queries: HashMap<u32, String>,

    next_stmt_id: u32,
}

impl ConnContext {
    pub fn new() -> Self {
        Self {
            mode: Mode::Replay,
            last_op: last_op::GREETING_SENT,
            greeting: None,
            server_capabilities: Capabilities::empty(),
            recorded_client_capabilities: Capabilities::empty(),
            client_capabilities: Capabilities::empty(),
            auth_plugin: AuthPlugin::MySqlNativePassword,
            use_ssl: false,
            prepared_statements: HashMap::new(),
            statement_queries: HashMap::new(),
            next_stmt_id: 1,
        }
    }

    /// Record the greeting this connection was served.
    pub fn store_greeting(&mut self, greeting: Handshake) {
        self.server_capabilities = greeting.server_capabilities;
        self.auth_plugin = greeting.auth_plugin.clone();
        self.greeting = Some(greeting);
    }

    pub fn greeting(&self) -> Option<&Handshake> {
        self.greeting.as_ref()
    }

    /// Capabilities used to re-encode server replies: the recorded client's
    /// view when we have it, the live client's otherwise.
    pub fn effective_capabilities(&self) -> Capabilities {
        if self.recorded_client_capabilities.is_empty() {
            self.client_capabilities
        } else {
            self.recorded_client_capabilities
        }
    }

    /// Allocate the next runtime statement id. Monotonic; never reused
    /// within a connection.
    pub fn next_statement_id(&mut self) -> u32 {
        let id = self.next_stmt_id;
        self.next_stmt_id += 1;
        id
    }

    /// Register a freshly prepared statement under its runtime id.
    pub fn insert_statement(&mut self, prepare_ok: ComStmtPrepareOk, query: String) {
        self.statement_queries
            .insert(prepare_ok.statement_id, query);
        self.prepared_statements
            .insert(prepare_ok.statement_id, prepare_ok);
    }

    /// Drop a statement on `COM_STMT_CLOSE` or connection teardown, keyed
    /// by the id the client sent.
    pub fn remove_statement(&mut self, statement_id: u32) {
        self.prepared_statements.remove(&statement_id);
        self.statement_queries.remove(&statement_id);
    }

    pub fn statement(&self, statement_id: u32) -> Option<&ComStmtPrepareOk> {
        self.prepared_statements.get(&statement_id)
    }

    /// Query text behind a runtime statement id, or `""`.
    pub fn statement_query(&self, statement_id: u32) -> &str {
        self.statement_queries
            .get(&statement_id)
            .map_or("", String::as_str)
    }

    pub(crate) fn param_count(&self, statement_id: u32) -> u16 {
        self.prepared_statements
            .get(&statement_id)
            .map_or(0, |ok| ok.params)
    }

    /// Advance `last_op` after the engine writes a server-side message.
    pub fn note_sent(&mut self, message: &Message) {
        self.last_op = match message {
            Message::HandshakeV10(_) => last_op::GREETING_SENT,
            Message::AuthSwitchRequest(_) => last_op::AUTH_SWITCH_SENT,
            Message::AuthMoreData(data) => match data.sha2_state() {
                Some(crate::protocol::auth::Sha2AuthState::PerformFullAuthentication) => {
                    last_op::FULL_AUTH_REQUESTED
                }
                _ => self.last_op,
            },
            Message::PublicKeyResponse(_) => last_op::PUBLIC_KEY_SENT,
            Message::Ok(_) | Message::Err(_) | Message::Eof(_) => last_op::COMMAND_PHASE,
            _ => last_op::COMMAND_PHASE,
        };
    }
}

impl Default for ConnContext {
    fn default() -> Self {
        Self::new()
    }
}
