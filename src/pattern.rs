use regex::{Regex, RegexBuilder};

use crate::error::EngineError;

/// Compile an IAM wildcard pattern into an anchored, case-insensitive regex.
///
/// `*` matches any run of characters (including none), `?` exactly one.
/// Everything else is literal.
pub fn wildcard_regex(pattern: &str) -> Result<Regex, EngineError> {
    let body = regex::escape(pattern)
        .replace(r"\*", ".*")
        .replace(r"\?", ".");
    Ok(RegexBuilder::new(&format!("^{body}$"))
        .case_insensitive(true)
        .dot_matches_new_line(true)
        .build()?)
}

pub fn has_wildcard(pattern: &str) -> bool {
    pattern.contains(['*', '?'])
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    #[parameterized(
        star_prefix = { "s3:Get*", "s3:GetObject", true },
        star_matches_empty = { "s3:Get*", "s3:Get", true },
        case_insensitive = { "S3:get*", "s3:GetObject", true },
        question_one_char = { "ec2:?unInstances", "ec2:RunInstances", true },
        question_not_zero = { "ec2:?RunInstances", "ec2:RunInstances", false },
        anchored_start = { "Get*", "s3:GetObject", false },
        anchored_end = { "s3:Get", "s3:GetObject", false },
        dots_are_literal = { "a.b", "axb", false },
        brackets_are_literal = { "arn:aws:s3:::[bucket]", "arn:aws:s3:::[bucket]", true },
        inner_star = { "arn:aws:s3:::*/logs/*", "arn:aws:s3:::my-bucket/logs/2024/01", true },
    )]
    fn test_wildcard_regex(pattern: &str, candidate: &str, expected: bool) {
        let re = wildcard_regex(pattern).unwrap();
        assert_eq!(re.is_match(candidate), expected);
    }

    #[test]
    fn test_has_wildcard() {
        assert!(has_wildcard("s3:*"));
        assert!(has_wildcard("s3:Get?bject"));
        assert!(!has_wildcard("s3:GetObject"));
    }
}
