//! Best-effort extraction of a move coordinate from free-form text.
//!
//! Shared by the strong-isolation path (parsing captured container output)
//! and the move advisor (parsing an LLM reply), so both obey one contract.
//! Extraction is total and syntactic only: no bounds or occupancy checks
//! happen here — the caller owns board validation.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static PARENS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\(\s*(\d+)\s*,\s*(\d+)\s*\)").expect("parenthesised pair regex")
});
static BARE_PAIR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)\s*,\s*(\d+)").expect("bare pair regex"));
static INTEGER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("integer regex"));

/// An optional (row, column) pair plus the raw text it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveCandidate {
    pub pair: Option<(i64, i64)>,
    pub raw: String,
}

impl MoveCandidate {
    /// A candidate that found nothing. Not an error — a legitimate
    /// "no answer" outcome.
    pub fn empty(raw: impl Into<String>) -> Self {
        Self {
            pair: None,
            raw: raw.into(),
        }
    }

    pub fn found(row: i64, col: i64, raw: impl Into<String>) -> Self {
        Self {
            pair: Some((row, col)),
            raw: raw.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pair.is_none()
    }

    /// Canonical text rendering; `extract(candidate.to_text())` round-trips.
    pub fn to_text(&self) -> String {
        match self.pair {
            Some((row, col)) => format!("({}, {})", row, col),
            None => String::new(),
        }
    }
}

/// Pull the first plausible (row, column) pair out of `text`.
///
/// Priority order:
/// 1. a parenthesised `(r, c)` pair
/// 2. a bare `r, c` pair
/// 3. the first two integers anywhere in the text
/// 4. an empty candidate
pub fn extract(text: &str) -> MoveCandidate {
    if let Some(caps) = PARENS.captures(text) {
        if let Some(pair) = parse_pair(&caps[1], &caps[2]) {
            return MoveCandidate::found(pair.0, pair.1, text);
        }
    }

    if let Some(caps) = BARE_PAIR.captures(text) {
        if let Some(pair) = parse_pair(&caps[1], &caps[2]) {
            return MoveCandidate::found(pair.0, pair.1, text);
        }
    }

    let numbers: Vec<i64> = INTEGER
        .find_iter(text)
        .filter_map(|m| m.as_str().parse().ok())
        .take(2)
        .collect();
    if let [row, col] = numbers[..] {
        return MoveCandidate::found(row, col, text);
    }

    MoveCandidate::empty(text)
}

fn parse_pair(row: &str, col: &str) -> Option<(i64, i64)> {
    Some((row.parse().ok()?, col.parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parenthesised_pair_wins() {
        let candidate = extract("I think (7, 7) is best");
        assert_eq!(candidate.pair, Some((7, 7)));
        assert_eq!(candidate.raw, "I think (7, 7) is best");
    }

    #[test]
    fn bare_pair() {
        assert_eq!(extract("14,3").pair, Some((14, 3)));
        assert_eq!(extract("row 14, col 3 looks strong").pair, Some((14, 3)));
    }

    #[test]
    fn loose_integers() {
        assert_eq!(extract("row 5 column 9").pair, Some((5, 9)));
    }

    #[test]
    fn parens_take_priority_over_earlier_bare_numbers() {
        // The first match of the highest-priority pattern is taken, even if
        // other numbers appear earlier in the text.
        assert_eq!(extract("move 3: play (7, 8)").pair, Some((7, 8)));
    }

    #[test]
    fn no_numbers_is_empty_not_error() {
        let candidate = extract("no idea");
        assert!(candidate.is_empty());
        assert_eq!(candidate.raw, "no idea");
    }

    #[test]
    fn single_number_is_empty() {
        assert!(extract("only 7 here").is_empty());
    }

    #[test]
    fn whitespace_variants() {
        assert_eq!(extract("(  7 ,7 )").pair, Some((7, 7)));
        assert_eq!(extract("7 , 12").pair, Some((7, 12)));
    }

    #[test]
    fn canonical_rendering_round_trips() {
        let candidate = MoveCandidate::found(7, 7, "(7, 7)");
        let round_tripped = extract(&candidate.to_text());
        assert_eq!(round_tripped.pair, candidate.pair);

        let empty = MoveCandidate::empty("");
        assert!(extract(&empty.to_text()).is_empty());
    }

    #[test]
    fn extraction_is_idempotent() {
        let first = extract("best move is (3, 10)!");
        let second = extract(&first.to_text());
        assert_eq!(first.pair, second.pair);
    }

    #[test]
    fn multiline_container_output() {
        let output = "thinking...\nscanning rows\n(0, 14)\n";
        assert_eq!(extract(output).pair, Some((0, 14)));
    }
}
