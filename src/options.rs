use std::time::Duration;

/// Read-only knobs for the outgoing side of the proxy.
///
/// The engine consumes these; loading them from CLI flags or a config file
/// happens elsewhere.
#[derive(Debug, Clone)]
pub struct ReplayOptions {
    /// Expected think time between client commands, in seconds. The command
    /// loop arms its read deadline at twice this value.
    pub sql_delay: u64,

    /// How far back the TLS collaborator should backdate manufactured
    /// certificates.
    pub tls_backdate: Duration,
}

impl ReplayOptions {
    /// The read deadline for one command-loop iteration.
    pub(crate) fn read_deadline(&self) -> Duration {
        Duration::from_secs(2 * self.sql_delay.max(1))
    }
}

impl Default for ReplayOptions {
    fn default() -> Self {
        Self {
            sql_delay: 5,
            tls_backdate: Duration::ZERO,
        }
    }
}
