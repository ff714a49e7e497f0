//! Label vocabulary for each side, Portuguese first then English.

use crate::models::Side;

const PLAYER: &[&str] = &["JOGADOR", "PLAYER"];
const BANKER: &[&str] = &["BANCA", "BANKER"];
const TIE: &[&str] = &["EMPATE", "TIE"];

pub fn keywords(side: Side) -> &'static [&'static str] {
    match side {
        Side::Player => PLAYER,
        Side::Banker => BANKER,
        Side::Tie => TIE,
    }
}

/// Byte span of one keyword occurrence within a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// Whole-word, case-insensitive occurrences of any of `side`'s keywords.
///
/// Uppercasing is ASCII-only so offsets stay valid for the original line.
pub fn find_keywords(line: &str, side: Side) -> Vec<Span> {
    let upper = line.to_ascii_uppercase();
    let bytes = upper.as_bytes();
    let mut spans = Vec::new();

    for keyword in keywords(side) {
        let mut from = 0;
        while let Some(offset) = upper[from..].find(keyword) {
            let start = from + offset;
            let end = start + keyword.len();
            let before_ok = start == 0 || !bytes[start - 1].is_ascii_alphanumeric();
            let after_ok = end == bytes.len() || !bytes[end].is_ascii_alphanumeric();
            if before_ok && after_ok {
                spans.push(Span { start, end });
            }
            from = end;
        }
    }

    spans.sort_by_key(|span| span.start);
    spans
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_both_languages_case_insensitive() {
        assert_eq!(find_keywords("Jogador 52%", Side::Player), vec![Span { start: 0, end: 7 }]);
        assert_eq!(find_keywords("the player", Side::Player), vec![Span { start: 4, end: 10 }]);
    }

    #[test]
    fn ignores_keyword_inside_other_words() {
        assert!(find_keywords("PARTIES 12%", Side::Tie).is_empty());
        assert!(find_keywords("BANCARIO", Side::Banker).is_empty());
    }

    #[test]
    fn punctuation_counts_as_boundary() {
        let spans = find_keywords("(TIE):8%", Side::Tie);
        assert_eq!(spans, vec![Span { start: 1, end: 4 }]);
    }

    #[test]
    fn finds_every_occurrence_in_order() {
        let spans = find_keywords("BANKER 40% / BANCA", Side::Banker);
        assert_eq!(spans.len(), 2);
        assert!(spans[0].start < spans[1].start);
    }
}
