//! The recorded prepared-statement index.
//!
//! Statement ids collide across recorded connections (every connection
//! counts from 1), so recorded PREPs are indexed by the connection id in
//! the mock metadata. The runtime side of the lifecycle (fresh ids handed
//! to the live client) lives in [`crate::codec::ConnContext`].

use std::collections::HashMap;
use std::sync::Arc;

use crate::mock::{Mock, MockType};
use crate::protocol::Message;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PrepEntry {
    pub statement_id: u32,
    pub query: String,
}

/// `connID -> recorded PREPs`, built fresh from each unfiltered snapshot.
/// A pure function of its input: identical snapshots index identically.
#[derive(Debug, Default)]
pub(crate) struct RecordedPrepIndex {
    by_conn: HashMap<String, Vec<PrepEntry>>,
}

impl RecordedPrepIndex {
    /// Index every data mock shaped like a recorded PREP: first request a
    /// `COM_STMT_PREPARE`, first response a prepare-ok. The recorder emits
    /// one PREP per mock; anything else contributes nothing.
    pub(crate) fn build(mocks: &[Arc<Mock>]) -> Self {
        let mut by_conn: HashMap<String, Vec<PrepEntry>> = HashMap::new();

        for mock in mocks {
            if mock.mock_type() == MockType::Config {
                continue;
            }

            let (Some(request), Some(response)) =
                (mock.requests.first(), mock.responses.first())
            else {
                continue;
            };

            if let (Message::StmtPrepare(prepare), Message::StmtPrepareOk(ok)) =
                (&request.message, &response.message)
            {
                by_conn
                    .entry(mock.conn_id().to_owned())
                    .or_default()
                    .push(PrepEntry {
                        statement_id: ok.statement_id,
                        query: prepare.query.clone(),
                    });
            }
        }

        Self { by_conn }
    }

    /// First recorded query for `(connID, stmtID)`, or `""`.
    pub(crate) fn query_for(&self, conn_id: &str, statement_id: u32) -> &str {
        self.by_conn
            .get(conn_id)
            .and_then(|entries| {
                entries
                    .iter()
                    .find(|entry| entry.statement_id == statement_id)
            })
            .map_or("", |entry| entry.query.as_str())
    }
}
