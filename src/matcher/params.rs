//! Bound-parameter equality.
//!
//! Recorded parameters come out of the mock library, live parameters off
//! the wire; the two sides may disagree on numeric width even when the
//! values are the same, so numbers are widened to a common representation
//! before comparison.

use crate::protocol::statement::BindParameter;
use crate::protocol::BindValue;

pub(crate) fn parameters_match(expected: &[BindParameter], actual: &[BindParameter]) -> bool {
    expected.len() == actual.len()
        && expected
            .iter()
            .zip(actual)
            .all(|(e, a)| parameter_matches(e, a))
}

/// Type, name, signedness and value must all agree.
pub(crate) fn parameter_matches(expected: &BindParameter, actual: &BindParameter) -> bool {
    expected.type_id == actual.type_id
        && expected.name == actual.name
        && expected.unsigned == actual.unsigned
        && values_match(&expected.value, &actual.value)
}

pub(crate) fn values_match(expected: &BindValue, actual: &BindValue) -> bool {
    use BindValue::*;

    match (expected, actual) {
        (Null, Null) => true,
        (Bool(e), Bool(a)) => e == a,
        (Text(e), Text(a)) => e == a,
        (Bytes(e), Bytes(a)) => e == a,

        // a recorded string and live bytes (or vice versa) with identical
        // content are the same value
        (Text(e), Bytes(a)) | (Bytes(a), Text(e)) => e.as_bytes() == a.as_ref(),

        (Int(e), Int(a)) => e == a,
        (UInt(e), UInt(a)) => e == a,
        (Double(e), Double(a)) => e == a,

        // sign-compatible widening; values past i64::MAX can only live on
        // the unsigned side
        (Int(i), UInt(u)) | (UInt(u), Int(i)) => *i >= 0 && *i as u64 == *u,

        (Int(i), Double(d)) | (Double(d), Int(i)) => *i as f64 == *d,
        (UInt(u), Double(d)) | (Double(d), UInt(u)) => *u as f64 == *d,

        _ => false,
    }
}
