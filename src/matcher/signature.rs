//! Query AST signatures.
//!
//! Two recordings of "the same" statement rarely agree byte-for-byte
//! (identifiers get requoted, literals change), but their grammatical shape
//! survives. The signature is the `->`-joined pre-order walk of node type
//! names; equal signatures are treated as a definitive match for DML.

use std::ops::ControlFlow;
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;
use sqlparser::ast::{Expr, ObjectName, Statement, TableFactor, Visit, Visitor};
use sqlparser::dialect::MySqlDialect;
use sqlparser::parser::Parser;
use tracing::trace;

/// Process-wide memoization, keyed by raw query text. Concurrent sessions
/// may compute the same signature twice; last write wins and both results
/// are identical.
static SIGNATURES: Lazy<DashMap<String, Arc<str>>> = Lazy::new(DashMap::new);

const DML_KEYWORDS: &[&str] = &["SELECT", "INSERT", "UPDATE", "DELETE", "REPLACE", "WITH"];

/// Whether the statement is DML (and therefore eligible for shape-based
/// matching).
pub(crate) fn is_dml(query: &str) -> bool {
    let trimmed = query.trim_start();

    DML_KEYWORDS.iter().any(|keyword| {
        trimmed.len() >= keyword.len()
            && trimmed[..keyword.len()].eq_ignore_ascii_case(keyword)
            && trimmed[keyword.len()..]
                .chars()
                .next()
                .map_or(true, |c| !c.is_ascii_alphanumeric())
    })
}

/// Compute (or recall) the signature for a query. `None` when the query
/// does not parse; only successful computations are cached.
pub(crate) fn signature(query: &str) -> Option<Arc<str>> {
    if let Some(cached) = SIGNATURES.get(query) {
        return Some(cached.clone());
    }

    let statements = Parser::parse_sql(&MySqlDialect {}, query).ok()?;

    let mut collector = NodeCollector::default();
    for statement in &statements {
        let _ = statement.visit(&mut collector);
    }

    let signature: Arc<str> = collector.nodes.join("->").into();
    trace!(query, signature = &*signature, "computed ast signature");

    SIGNATURES.insert(query.to_owned(), signature.clone());

    Some(signature)
}

/// Definitive equality by shape: both sides must parse and agree.
pub(crate) fn signatures_match(expected: &str, actual: &str) -> bool {
    match (signature(expected), signature(actual)) {
        (Some(e), Some(a)) => e == a,
        _ => false,
    }
}

#[derive(Default)]
struct NodeCollector {
    nodes: Vec<String>,
}

// The first token of a node's debug form is its variant name, for tuple and
// struct variants alike; that keeps the walk exhaustive across parser
// upgrades without a hand-written match over every AST type.
fn variant_name(node: &impl std::fmt::Debug) -> String {
    format!("{node:?}")
        .chars()
        .take_while(char::is_ascii_alphanumeric)
        .collect()
}

impl Visitor for NodeCollector {
    type Break = ();

    fn pre_visit_statement(&mut self, statement: &Statement) -> ControlFlow<()> {
        self.nodes.push(variant_name(statement));
        ControlFlow::Continue(())
    }

    fn pre_visit_relation(&mut self, _relation: &ObjectName) -> ControlFlow<()> {
        self.nodes.push("Table".to_owned());
        ControlFlow::Continue(())
    }

    fn pre_visit_table_factor(&mut self, table_factor: &TableFactor) -> ControlFlow<()> {
        self.nodes.push(variant_name(table_factor));
        ControlFlow::Continue(())
    }

    fn pre_visit_expr(&mut self, expr: &Expr) -> ControlFlow<()> {
        self.nodes.push(variant_name(expr));
        ControlFlow::Continue(())
    }
}
