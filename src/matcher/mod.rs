//! Semantic matching of live commands against recorded mocks.
//!
//! Definitive paths (query text, AST shape, execute-with-resolved-queries)
//! stop the walk at the first hit; everything else keeps the best-scoring
//! candidate. Statement ids and auth responses never participate: both are
//! meaningless across runs.

pub(crate) mod compat;
mod execute;
mod params;
mod signature;

use execute::{score_close, score_execute};
use signature::{is_dml, signatures_match};

use std::sync::Arc;

use tracing::debug;

use crate::codec::ConnContext;
use crate::error::{Error, Result};
use crate::mock::{Mock, MockStore, MockType};
use crate::protocol::connect::{HandshakeResponse, SslRequest};
use crate::protocol::response::OkPacket;
use crate::protocol::{Message, Packet, PacketHeader};
use crate::session::prepared::RecordedPrepIndex;

/// What the dispatcher should do with a matched command.
#[derive(Debug)]
pub(crate) enum MatchOutcome {
    /// The replies to write, in order (empty for no-response commands that
    /// matched a mock with no recorded response).
    Replies(Vec<Packet>),

    /// The client said goodbye; shut the connection down cleanly.
    Quit,
}

/// SSLRequest selection predicate: payload length is connection-specific
/// and deliberately ignored.
pub(crate) fn ssl_requests_match(expected: &SslRequest, actual: &SslRequest) -> bool {
    expected.max_packet_size == actual.max_packet_size
        && expected.collation == actual.collation
        && expected.filler == actual.filler
}

/// HandshakeResponse41 selection predicate. The auth response is derived
/// from the live salt and never compared.
pub(crate) fn handshake_responses_match(
    expected: &HandshakeResponse,
    actual: &HandshakeResponse,
) -> bool {
    expected.max_packet_size == actual.max_packet_size
        && expected.collation == actual.collation
        && expected.filler == actual.filler
        && expected.username == actual.username
        && expected.zstd_compression_level == actual.zstd_compression_level
        && compat::database_matches(
            expected.database.as_deref().unwrap_or(""),
            actual.database.as_deref().unwrap_or(""),
        )
        && compat::plugin_matches(
            expected.auth_plugin.as_ref().map_or("", |p| p.as_str()),
            actual.auth_plugin.as_ref().map_or("", |p| p.as_str()),
        )
}

/// Match one live command against the unfiltered mock set, consuming the
/// chosen mock and returning its (copied, never aliased) responses.
pub(crate) async fn match_command(
    ctx: &mut ConnContext,
    store: &dyn MockStore,
    request: &Packet,
) -> Result<MatchOutcome> {
    // Quit first: it must terminate cleanly even with an empty store
    if matches!(request.message, Message::Quit(_)) {
        return Ok(MatchOutcome::Quit);
    }

    let mocks = store.get_unfiltered_mocks().await?;
    if mocks.is_empty() {
        return Err(Error::NoMocks);
    }

    let prep_index = RecordedPrepIndex::build(&mocks);

    let mut definitive: Option<&Arc<Mock>> = None;
    let mut best: Option<(&Arc<Mock>, i64)> = None;

    'mocks: for mock in &mocks {
        if mock.mock_type() == MockType::Config {
            continue;
        }

        for recorded in &mock.requests {
            match (&request.message, &recorded.message) {
                (Message::Query(actual), Message::Query(expected)) => {
                    if query_matches(
                        &expected.query,
                        &recorded.header,
                        &actual.query,
                        &request.header,
                    ) {
                        definitive = Some(mock);
                        break 'mocks;
                    }
                }

                (Message::StmtPrepare(actual), Message::StmtPrepare(expected)) => {
                    if query_matches(
                        &expected.query,
                        &recorded.header,
                        &actual.query,
                        &request.header,
                    ) {
                        definitive = Some(mock);
                        break 'mocks;
                    }
                }

                (Message::StmtExecute(actual), Message::StmtExecute(expected)) => {
                    let expected_query =
                        prep_index.query_for(mock.conn_id(), expected.statement_id);
                    let actual_query = ctx.statement_query(actual.statement_id);

                    let scored = score_execute(
                        expected,
                        &recorded.header,
                        actual,
                        &request.header,
                        expected_query,
                        actual_query,
                    );

                    if scored.definitive {
                        definitive = Some(mock);
                        break 'mocks;
                    }

                    offer(&mut best, mock, scored.score);
                }

                (Message::StmtClose(actual), Message::StmtClose(expected)) => {
                    let expected_query =
                        prep_index.query_for(mock.conn_id(), expected.statement_id);
                    let actual_query = ctx.statement_query(actual.statement_id);

                    let scored = score_close(
                        &recorded.header,
                        &request.header,
                        expected_query,
                        actual_query,
                    );

                    offer(&mut best, mock, scored.score);
                }

                (Message::StmtSendLongData(actual), Message::StmtSendLongData(expected)) => {
                    let mut score = utility_score(&recorded.header, &request.header);
                    if expected.param_index == actual.param_index {
                        score += 1;
                    }
                    if expected.data == actual.data {
                        score += 1;
                    }

                    offer(&mut best, mock, score);
                }

                (Message::InitDb(actual), Message::InitDb(expected)) => {
                    let mut score = utility_score(&recorded.header, &request.header);
                    if expected.schema == actual.schema {
                        score += 1;
                    }

                    offer(&mut best, mock, score);
                }

                (Message::Ping(_), Message::Ping(_))
                | (Message::Statistics(_), Message::Statistics(_))
                | (Message::Debug(_), Message::Debug(_))
                | (Message::ResetConnection(_), Message::ResetConnection(_))
                | (Message::StmtReset(_), Message::StmtReset(_)) => {
                    offer(
                        &mut best,
                        mock,
                        utility_score(&recorded.header, &request.header),
                    );
                }

                _ => {}
            }
        }
    }

    let chosen = match (definitive, best) {
        (Some(mock), _) => mock,
        (None, Some((mock, score))) => {
            debug!(mock = %mock.name, score, "best-effort match");
            mock
        }
        (None, None) => {
            // control statements (transactions, DDL, USE, SET) often go
            // unrecorded; answer them with a minimal OK instead of killing
            // the session
            if let Message::Query(query) = &request.message {
                if is_control_statement(&query.query) {
                    debug!(query = %query.query, "synthesizing OK for control statement");
                    return Ok(MatchOutcome::Replies(vec![synthetic_ok(&request.header)]));
                }
            }

            return Err(Error::NoMatch {
                request: request.message.kind().into(),
            });
        }
    };

    let replies = consume(ctx, store, chosen, request).await?;

    Ok(MatchOutcome::Replies(replies))
}

/// Verbatim text (with equal payload lengths) is definitive; otherwise two
/// DML statements match by AST shape. A DML/non-DML pair never matches.
fn query_matches(
    expected: &str,
    expected_header: &PacketHeader,
    actual: &str,
    actual_header: &PacketHeader,
) -> bool {
    if expected_header.length == actual_header.length && expected == actual {
        return true;
    }

    if is_dml(expected) != is_dml(actual) {
        return false;
    }

    is_dml(expected) && signatures_match(expected, actual)
}

fn utility_score(expected_header: &PacketHeader, actual_header: &PacketHeader) -> i64 {
    let mut score = 1; // command byte; variants already agree

    if compat::headers_match(expected_header, actual_header) {
        score += 2;
    }

    score
}

fn offer<'a>(best: &mut Option<(&'a Arc<Mock>, i64)>, mock: &'a Arc<Mock>, score: i64) {
    match best {
        Some((_, current)) if *current >= score => {}
        _ => *best = Some((mock, score)),
    }
}

/// Consume the chosen mock (compare-and-swap through the store) and copy
/// its responses. A fresh runtime statement id is spliced into the copy of
/// a prepare response and registered in the context.
async fn consume(
    ctx: &mut ConnContext,
    store: &dyn MockStore,
    mock: &Arc<Mock>,
    request: &Packet,
) -> Result<Vec<Packet>> {
    if !store.update_unfiltered_mock(mock, mock.consumed()).await {
        return Err(Error::ConsumeRace {
            mock: mock.name.clone().into(),
        });
    }

    debug!(mock = %mock.name, kind = request.message.kind(), "consumed mock");

    let mut replies = mock.responses.clone();

    if let Message::StmtPrepare(prepare) = &request.message {
        for packet in &mut replies {
            if let Message::StmtPrepareOk(ok) = &mut packet.message {
                ok.statement_id = ctx.next_statement_id();
                ctx.insert_statement(ok.clone(), prepare.query.clone());
                break;
            }
        }
    }

    Ok(replies)
}

const CONTROL_PREFIXES: &[&str] = &[
    "BEGIN",
    "START TRANSACTION",
    "COMMIT",
    "ROLLBACK",
    "SET ",
    "ALTER ",
    "CREATE ",
    "DROP ",
    "TRUNCATE ",
    "RENAME ",
    "LOCK TABLES",
    "UNLOCK TABLES",
    "SAVEPOINT ",
    "RELEASE SAVEPOINT ",
    "USE ",
];

fn is_control_statement(query: &str) -> bool {
    let trimmed = query.trim_start();

    CONTROL_PREFIXES.iter().any(|prefix| {
        trimmed.len() >= prefix.len() && trimmed[..prefix.len()].eq_ignore_ascii_case(prefix)
    })
}

/// The minimal OK for an unmocked control statement; sequence id is the
/// inbound id plus one.
fn synthetic_ok(request_header: &PacketHeader) -> Packet {
    Packet::new(
        PacketHeader {
            length: 7,
            seq_id: request_header.seq_id.wrapping_add(1),
        },
        Message::Ok(OkPacket::synthetic()),
    )
}

#[cfg(test)]
mod tests {
    use super::{is_control_statement, query_matches};
    use crate::protocol::PacketHeader;

    fn header(length: u32) -> PacketHeader {
        PacketHeader { length, seq_id: 0 }
    }

    #[test]
    fn verbatim_query_with_equal_length_matches() {
        assert!(query_matches(
            "SELECT 1",
            &header(9),
            "SELECT 1",
            &header(9),
        ));
    }

    #[test]
    fn dml_and_non_dml_never_match() {
        assert!(!query_matches(
            "SELECT * FROM t",
            &header(16),
            "SHOW TABLES",
            &header(12),
        ));
    }

    #[test]
    fn dml_matches_by_shape() {
        assert!(query_matches(
            "SELECT * FROM users WHERE id = 1",
            &header(33),
            "SELECT * FROM users WHERE id = 9",
            &header(33),
        ));
    }

    #[test]
    fn control_statements_are_recognized() {
        assert!(is_control_statement("BEGIN"));
        assert!(is_control_statement("begin"));
        assert!(is_control_statement("START TRANSACTION"));
        assert!(is_control_statement("SET autocommit=0"));
        assert!(is_control_statement("USE shop"));
        assert!(!is_control_statement("SELECT 1"));
    }
}
