//! Single-value comparisons behind each base operator.

use std::cmp::Ordering;
use std::str::FromStr;

use caseless::Caseless;
use ipnetwork::IpNetwork;
use tracing::warn;
use unicode_normalization::UnicodeNormalization;

use crate::error::EngineError;
use crate::pattern::wildcard_regex;
use crate::types::Value;

use super::operator::BaseOperator;

/// Compares one context value against one (already bound) comparison value.
pub(crate) type Evaluator = Box<dyn Fn(&Value) -> bool + Send + Sync>;

/// Build the evaluator for `base` against a single comparison value.
///
/// Comparison values are parsed once here. A comparison value that cannot be
/// parsed (malformed CIDR, non-numeric number) yields an evaluator that never
/// matches.
pub(crate) fn base_evaluator(
    base: BaseOperator,
    expected: &Value,
) -> Result<Evaluator, EngineError> {
    use BaseOperator::*;

    let evaluator: Evaluator = match base {
        Bool => {
            let expected = expected.as_bool();
            Box::new(move |actual: &Value| expected.is_some() && actual.as_bool() == expected)
        }
        Null => {
            let expect_null = expected.as_bool().unwrap_or(false);
            Box::new(move |actual: &Value| actual.is_null() == expect_null)
        }
        StringEquals | ArnEquals => {
            let expected = expected.to_text();
            Box::new(move |actual: &Value| actual.to_text() == expected)
        }
        StringNotEquals | ArnNotEquals => {
            let expected = expected.to_text();
            Box::new(move |actual: &Value| actual.to_text() != expected)
        }
        StringEqualsIgnoreCase => {
            let expected = fold_case(&expected.to_text());
            Box::new(move |actual: &Value| fold_case(&actual.to_text()) == expected)
        }
        StringNotEqualsIgnoreCase => {
            let expected = fold_case(&expected.to_text());
            Box::new(move |actual: &Value| fold_case(&actual.to_text()) != expected)
        }
        StringLike | ArnLike => {
            let re = wildcard_regex(&expected.to_text())?;
            Box::new(move |actual: &Value| re.is_match(&actual.to_text()))
        }
        StringNotLike | ArnNotLike => {
            let re = wildcard_regex(&expected.to_text())?;
            Box::new(move |actual: &Value| !re.is_match(&actual.to_text()))
        }
        NumericEquals | NumericNotEquals | NumericLessThan | NumericLessThanEquals
        | NumericGreaterThan | NumericGreaterThanEquals => {
            let test = ordering_test(base);
            let expected = expected.as_f64();
            Box::new(move |actual: &Value| match (actual.as_f64(), expected) {
                (Some(a), Some(e)) => a.partial_cmp(&e).is_some_and(test),
                _ => false,
            })
        }
        DateEquals | DateNotEquals | DateLessThan | DateLessThanEquals | DateGreaterThan
        | DateGreaterThanEquals => {
            let test = ordering_test(base);
            let expected = expected.as_date();
            Box::new(move |actual: &Value| match (actual.as_date(), expected) {
                (Some(a), Some(e)) => test(a.cmp(&e)),
                _ => false,
            })
        }
        IpAddress | NotIpAddress => {
            let negate = base == NotIpAddress;
            match IpNetwork::from_str(expected.to_text().trim()) {
                Ok(network) => Box::new(move |actual: &Value| match parse_ip(actual) {
                    Some(ip) => within(&network, &ip) != negate,
                    None => false,
                }),
                Err(err) => {
                    warn!(
                        event = "Condition",
                        phase = "Compile",
                        operator = %base,
                        operand = %expected,
                        error = %err,
                        "malformed IP operand, evaluator never matches"
                    );
                    Box::new(|_: &Value| false)
                }
            }
        }
        BinaryEquals => {
            let expected = expected.to_text().into_bytes();
            Box::new(move |actual: &Value| actual.to_text().as_bytes() == expected.as_slice())
        }
    };
    Ok(evaluator)
}

/// Compatibility caseless form: NFKD, full case folding, NFKD again.
fn fold_case(s: &str) -> String {
    s.nfkd().default_case_fold().nfkd().collect()
}

/// A context address or network lies within the operand network only if
/// both its first and last address do.
fn within(operand: &IpNetwork, actual: &IpNetwork) -> bool {
    operand.is_ipv4() == actual.is_ipv4()
        && operand.contains(actual.network())
        && operand.contains(actual.broadcast())
}

fn parse_ip(value: &Value) -> Option<IpNetwork> {
    IpNetwork::from_str(value.to_text().trim()).ok()
}

fn ordering_test(base: BaseOperator) -> fn(Ordering) -> bool {
    use BaseOperator::*;

    match base {
        NumericNotEquals | DateNotEquals => |o: Ordering| o != Ordering::Equal,
        NumericLessThan | DateLessThan => |o: Ordering| o == Ordering::Less,
        NumericLessThanEquals | DateLessThanEquals => |o: Ordering| o != Ordering::Greater,
        NumericGreaterThan | DateGreaterThan => |o: Ordering| o == Ordering::Greater,
        NumericGreaterThanEquals | DateGreaterThanEquals => |o: Ordering| o != Ordering::Less,
        _ => |o: Ordering| o == Ordering::Equal,
    }
}
