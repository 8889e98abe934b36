//! Recorded mock artifacts and the store contract the engine consumes.

mod store;

pub use store::{InMemoryMockStore, MockCounts, MockStore};

use std::collections::HashMap;

use crate::protocol::Packet;

/// Metadata key naming the mock flavor (`config` or `data`).
pub const META_TYPE: &str = "type";

/// Metadata key carrying the recorded connection id; scopes the
/// recorded-PREP index.
pub const META_CONN_ID: &str = "connID";

/// Protocols a mock can belong to. This engine only replays MySQL; the tag
/// exists because mock libraries are shared across protocol engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum MockKind {
    Mysql,
}

/// How a mock participates in replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockType {
    /// One full connection-phase exchange.
    Config,

    /// One command-phase request/response pair.
    Data,
}

/// One recorded request/response artifact.
///
/// Matching never mutates a stored mock; consumption replaces the instance
/// through [`MockStore::update_unfiltered_mock`] with `is_filtered` cleared
/// and a fresh sort order.
#[derive(Debug, Clone)]
pub struct Mock {
    pub name: String,
    pub kind: MockKind,
    pub metadata: HashMap<String, String>,
    pub requests: Vec<Packet>,
    pub responses: Vec<Packet>,

    /// True until first consumption.
    pub is_filtered: bool,

    /// Monotonic consumption order, assigned by the store; used externally
    /// to report replay ordering.
    pub sort_order: u64,
}

impl Mock {
    pub fn new(
        name: impl Into<String>,
        metadata: HashMap<String, String>,
        requests: Vec<Packet>,
        responses: Vec<Packet>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: MockKind::Mysql,
            metadata,
            requests,
            responses,
            is_filtered: true,
            sort_order: 0,
        }
    }

    pub fn mock_type(&self) -> MockType {
        match self.metadata.get(META_TYPE).map(String::as_str) {
            Some("config") => MockType::Config,
            _ => MockType::Data,
        }
    }

    /// Recorded connection id, or `""` when the recorder did not tag one.
    pub fn conn_id(&self) -> &str {
        self.metadata.get(META_CONN_ID).map_or("", String::as_str)
    }

    /// A copy marked consumed; the store assigns the sort order.
    pub(crate) fn consumed(&self) -> Self {
        let mut mock = self.clone();
        mock.is_filtered = false;
        mock
    }
}
