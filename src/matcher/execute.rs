//! Score-based matching for `COM_STMT_EXECUTE` and `COM_STMT_CLOSE`.
//!
//! Statement ids are never compared: the live client's ids are runtime ids
//! this engine invented, and the recorded ids belong to a different
//! numbering. Queries resolved through the two lifecycles promote a
//! candidate instead.

use crate::matcher::params::{parameter_matches, parameters_match};
use crate::matcher::{compat, signature};
use crate::protocol::statement::ComStmtExecute;
use crate::protocol::PacketHeader;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Scored {
    pub definitive: bool,
    pub score: i64,
}

pub(crate) fn score_execute(
    expected: &ComStmtExecute,
    expected_header: &PacketHeader,
    actual: &ComStmtExecute,
    actual_header: &PacketHeader,
    expected_query: &str,
    actual_query: &str,
) -> Scored {
    let mut score = 0;

    if compat::headers_match(expected_header, actual_header) {
        score += 2;
    }

    // command byte; both sides decoded as EXECUTE
    score += 1;

    if expected.flags == actual.flags {
        score += 1;
    }

    if expected.iterations == actual.iterations {
        score += 1;
    }

    if expected.parameters.len() == actual.parameters.len() {
        score += 1;
    }

    if expected.new_params_bind_flag == actual.new_params_bind_flag {
        score += 1;
    }

    for (e, a) in expected.parameters.iter().zip(&actual.parameters) {
        if parameter_matches(e, a) {
            score += 1;
        }
    }

    let all_params = parameters_match(&expected.parameters, &actual.parameters);

    if !expected_query.is_empty() && !actual_query.is_empty() {
        if expected_query.eq_ignore_ascii_case(actual_query) {
            score += 10;
            return Scored {
                definitive: all_params,
                score,
            };
        }

        if signature::signatures_match(expected_query, actual_query) {
            score += 6;
            return Scored {
                definitive: all_params,
                score,
            };
        }
    }

    Scored {
        definitive: false,
        score,
    }
}

pub(crate) fn score_close(
    expected_header: &PacketHeader,
    actual_header: &PacketHeader,
    expected_query: &str,
    actual_query: &str,
) -> Scored {
    let mut score = 0;

    if compat::headers_match(expected_header, actual_header) {
        score += 2;
    }

    if !expected_query.is_empty() && !actual_query.is_empty() {
        if expected_query == actual_query {
            score += 10;
        } else if signature::signatures_match(expected_query, actual_query) {
            score += 6;
        }
    }

    Scored {
        definitive: false,
        score,
    }
}
