//! Output comparison
//!
//! Decides pass/fail for a cleanly exited fixture. Two modes only: exact
//! (ends trimmed) and whitespace-token equality. No case folding and no
//! numeric tolerance.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Equality rule applied to expected vs. actual output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareMode {
    /// Trim both ends, then byte-for-byte
    #[default]
    Exact,
    /// Split on whitespace runs, compare word sequences
    Tokens,
}

impl FromStr for CompareMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "exact" => Ok(CompareMode::Exact),
            "tokens" | "token" => Ok(CompareMode::Tokens),
            other => Err(format!("unknown compare mode `{}` (expected exact|tokens)", other)),
        }
    }
}

/// First differing token within the shared prefix
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenMismatch {
    pub index: usize,
    pub expected: String,
    pub actual: String,
}

/// Token counts when the sequences differ in length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LengthMismatch {
    pub expected: usize,
    pub actual: usize,
}

/// Why the outputs differ. Both locators are empty in exact mode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Mismatch {
    pub token: Option<TokenMismatch>,
    pub length: Option<LengthMismatch>,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(token) = &self.token {
            parts.push(format!(
                "token {}: expected `{}`, got `{}`",
                token.index, token.expected, token.actual
            ));
        }
        if let Some(length) = &self.length {
            parts.push(format!(
                "expected {} tokens, got {}",
                length.expected, length.actual
            ));
        }
        if parts.is_empty() {
            write!(f, "output differs")
        } else {
            write!(f, "{}", parts.join("; "))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", content = "mismatch", rename_all = "snake_case")]
pub enum ComparisonOutcome {
    Pass,
    Fail(Mismatch),
}

/// Compare program output with expected output
pub fn compare(expected: &str, actual: &str, mode: CompareMode) -> ComparisonOutcome {
    match mode {
        CompareMode::Exact => {
            if expected.trim() == actual.trim() {
                ComparisonOutcome::Pass
            } else {
                ComparisonOutcome::Fail(Mismatch::default())
            }
        }
        CompareMode::Tokens => compare_tokens(expected, actual),
    }
}

fn compare_tokens(expected: &str, actual: &str) -> ComparisonOutcome {
    let expected_tokens: Vec<&str> = expected.split_whitespace().collect();
    let actual_tokens: Vec<&str> = actual.split_whitespace().collect();

    let token = expected_tokens
        .iter()
        .zip(actual_tokens.iter())
        .position(|(e, a)| e != a)
        .map(|index| TokenMismatch {
            index,
            expected: expected_tokens[index].to_string(),
            actual: actual_tokens[index].to_string(),
        });

    let length = (expected_tokens.len() != actual_tokens.len()).then(|| LengthMismatch {
        expected: expected_tokens.len(),
        actual: actual_tokens.len(),
    });

    if token.is_none() && length.is_none() {
        ComparisonOutcome::Pass
    } else {
        ComparisonOutcome::Fail(Mismatch { token, length })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_equal() {
        assert_eq!(compare("1 2 3", "1 2 3", CompareMode::Tokens), ComparisonOutcome::Pass);
    }

    #[test]
    fn test_tokens_ignore_layout() {
        assert_eq!(compare("1 2\n3\n", "  1\t2 3", CompareMode::Tokens), ComparisonOutcome::Pass);
    }

    #[test]
    fn test_tokens_first_mismatch() {
        let outcome = compare("1 2 3", "1 2 4", CompareMode::Tokens);

        assert_eq!(
            outcome,
            ComparisonOutcome::Fail(Mismatch {
                token: Some(TokenMismatch {
                    index: 2,
                    expected: "3".to_string(),
                    actual: "4".to_string(),
                }),
                length: None,
            })
        );
    }

    #[test]
    fn test_tokens_length_mismatch_only() {
        let outcome = compare("1 2", "1 2 3", CompareMode::Tokens);

        assert_eq!(
            outcome,
            ComparisonOutcome::Fail(Mismatch {
                token: None,
                length: Some(LengthMismatch {
                    expected: 2,
                    actual: 3,
                }),
            })
        );
    }

    #[test]
    fn test_tokens_both_facts_reported() {
        let ComparisonOutcome::Fail(mismatch) = compare("5 6 7", "5 9", CompareMode::Tokens) else {
            panic!("expected failure");
        };

        assert_eq!(mismatch.token.as_ref().map(|t| t.index), Some(1));
        assert_eq!(mismatch.length.map(|l| (l.expected, l.actual)), Some((3, 2)));
        assert_eq!(
            mismatch.to_string(),
            "token 1: expected `6`, got `9`; expected 3 tokens, got 2"
        );
    }

    #[test]
    fn test_tokens_no_numeric_tolerance() {
        assert_ne!(compare("1.0", "1", CompareMode::Tokens), ComparisonOutcome::Pass);
    }

    #[test]
    fn test_empty_actual_output() {
        let outcome = compare("42", "", CompareMode::Tokens);
        assert_eq!(
            outcome,
            ComparisonOutcome::Fail(Mismatch {
                token: None,
                length: Some(LengthMismatch {
                    expected: 1,
                    actual: 0,
                }),
            })
        );

        assert_ne!(compare("42", "", CompareMode::Exact), ComparisonOutcome::Pass);
        assert_eq!(compare("", "\n", CompareMode::Exact), ComparisonOutcome::Pass);
    }

    #[test]
    fn test_exact_trims_ends_only() {
        assert_eq!(compare("hello\n", "hello", CompareMode::Exact), ComparisonOutcome::Pass);
        assert_ne!(compare("hello", "Hello", CompareMode::Exact), ComparisonOutcome::Pass);
        assert_ne!(compare("a  b", "a b", CompareMode::Exact), ComparisonOutcome::Pass);
    }

    #[test]
    fn test_exact_failure_has_no_locator() {
        assert_eq!(
            compare("a", "b", CompareMode::Exact),
            ComparisonOutcome::Fail(Mismatch::default())
        );
        assert_eq!(Mismatch::default().to_string(), "output differs");
    }

    #[test]
    fn test_compare_mode_from_str() {
        assert_eq!("exact".parse::<CompareMode>(), Ok(CompareMode::Exact));
        assert_eq!(" Tokens ".parse::<CompareMode>(), Ok(CompareMode::Tokens));
        assert!("fuzzy".parse::<CompareMode>().is_err());
    }
}
