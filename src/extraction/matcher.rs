//! Keyword proximity matching shared by the OCR and page-text extractors.
//!
//! Lines carrying explicit `NN%` tokens are searched before lines with bare
//! numbers. For each side the first line (top to bottom) that carries one of
//! its labels together with a value wins; inside that line the value closest
//! to the label is taken when it sits within `adjacency_gap` bytes, anything
//! still ambiguous is settled by [`AmbiguityPolicy`]. A header row labelling
//! several sides is aligned column by column with the value row next to it.
//! A lone label with no value borrows one from a neighbouring line that is not
//! labelled for another side. Every token is given to at most one side.

use std::collections::HashSet;

use crate::models::{Percentages, Side};

use super::config::{AmbiguityPolicy, ExtractionConfig};
use super::keywords::{find_keywords, Span};
use super::percent::{PercentMatch, PercentScanner};

const ENABLE_LOGS: bool = true;

use crate::log_debug;

/// `(line index, token index)` of one percentage token.
type TokenId = (usize, usize);

/// Statistics bar order, left to right.
const BAR_ORDER: [Side; 3] = [Side::Player, Side::Tie, Side::Banker];

struct ScannedLine<'a> {
    text: &'a str,
    percents: Vec<PercentMatch>,
    labels: [Vec<Span>; 3],
}

impl ScannedLine<'_> {
    fn labels(&self, side: Side) -> &[Span] {
        &self.labels[side_index(side)]
    }

    fn labelled_for_other_than(&self, side: Side) -> bool {
        Side::ALL
            .iter()
            .any(|other| *other != side && !self.labels(*other).is_empty())
    }

    fn is_labelled(&self) -> bool {
        self.labels.iter().any(|spans| !spans.is_empty())
    }

    /// The scanner yields either explicit or bare tokens for a line, never both.
    fn explicit(&self) -> bool {
        self.percents.first().is_some_and(|pct| pct.explicit)
    }

    /// First label of every side present, in reading order.
    fn headers(&self) -> Vec<(Side, Span)> {
        let mut headers: Vec<(Side, Span)> = Side::ALL
            .iter()
            .filter_map(|side| self.labels(*side).first().map(|span| (*side, *span)))
            .collect();
        headers.sort_by_key(|(_, span)| span.start);
        headers
    }

    fn free(&self, idx: usize, claimed: &HashSet<TokenId>) -> Vec<usize> {
        (0..self.percents.len())
            .filter(|token| !claimed.contains(&(idx, *token)))
            .collect()
    }
}

fn side_index(side: Side) -> usize {
    match side {
        Side::Player => 0,
        Side::Banker => 1,
        Side::Tie => 2,
    }
}

pub struct LineMatcher {
    config: ExtractionConfig,
    scanner: PercentScanner,
}

impl LineMatcher {
    pub fn new(config: ExtractionConfig) -> Self {
        Self {
            config,
            scanner: PercentScanner::new(),
        }
    }

    pub fn extract<S: AsRef<str>>(&self, lines: &[S]) -> Percentages {
        let scanned: Vec<ScannedLine<'_>> = lines
            .iter()
            .map(|line| self.scan(line.as_ref()))
            .collect();

        let mut found = Percentages::default();
        let mut claimed = HashSet::new();

        for explicit in [true, false] {
            for side in Side::ALL {
                if found.get(side).is_some() {
                    continue;
                }
                if let Some((token, value)) = self.same_line(&scanned, side, explicit, &claimed) {
                    claimed.insert(token);
                    found.set(side, value);
                }
            }
        }

        self.header_rows(&scanned, &mut found, &mut claimed);

        for side in Side::ALL {
            if found.get(side).is_some() {
                continue;
            }
            if let Some((token, value)) = self.neighbour_line(&scanned, side, &claimed) {
                claimed.insert(token);
                found.set(side, value);
            }
        }

        if self.config.infer_unlabeled_triplet && found.found() < 3 {
            fill_from_triplet(&scanned, &mut found, &claimed);
        }

        found
    }

    fn scan<'a>(&self, text: &'a str) -> ScannedLine<'a> {
        ScannedLine {
            text,
            percents: self.scanner.scan(text, self.config.accept_bare_numbers),
            labels: Side::ALL.map(|side| find_keywords(text, side)),
        }
    }

    fn same_line(
        &self,
        lines: &[ScannedLine<'_>],
        side: Side,
        explicit: bool,
        claimed: &HashSet<TokenId>,
    ) -> Option<(TokenId, f64)> {
        for (idx, line) in lines.iter().enumerate() {
            if line.labels(side).is_empty() || line.percents.is_empty() || line.explicit() != explicit {
                continue;
            }
            let free = line.free(idx, claimed);
            let Some(token) = self.closest_to_label(line, side, &free) else {
                continue;
            };
            let value = line.percents[token].value;
            log_debug!("{} {}% from line '{}'", side.as_str(), value, line.text);
            return Some(((idx, token), value));
        }
        None
    }

    fn closest_to_label(&self, line: &ScannedLine<'_>, side: Side, free: &[usize]) -> Option<usize> {
        // Prefer values that sit closer to this side's label than to any other
        // label on the line; "PLAYER 48% TIE 9%" must not give 48 to Tie.
        let owned: Vec<usize> = free
            .iter()
            .copied()
            .filter(|token| owner(line, &line.percents[*token]) == Some(side))
            .collect();
        let candidates: &[usize] = if owned.is_empty() { free } else { &owned };

        let labels = line.labels(side);
        let gaps: Vec<usize> = candidates
            .iter()
            .map(|token| {
                labels
                    .iter()
                    .map(|label| gap(&line.percents[*token], label))
                    .min()
                    .unwrap_or(usize::MAX)
            })
            .collect();
        let nearest_gap = gaps.iter().copied().min()?;

        if nearest_gap <= self.config.adjacency_gap {
            let nearest: Vec<usize> = candidates
                .iter()
                .zip(&gaps)
                .filter(|(_, gap)| **gap == nearest_gap)
                .map(|(token, _)| *token)
                .collect();
            return pick(&line.percents, &nearest, self.config.ambiguity);
        }

        pick(&line.percents, candidates, self.config.ambiguity)
    }

    /// `PLAYER  TIE  BANKER` over (or under) `40%  8%  52%`.
    fn header_rows(
        &self,
        lines: &[ScannedLine<'_>],
        found: &mut Percentages,
        claimed: &mut HashSet<TokenId>,
    ) {
        'headers: for (idx, line) in lines.iter().enumerate() {
            let headers = line.headers();
            if headers.len() < 2 || !line.percents.is_empty() {
                continue;
            }
            for candidate in self.neighbours(idx) {
                let Some(row) = lines.get(candidate) else {
                    continue;
                };
                if row.percents.is_empty() || row.is_labelled() {
                    continue;
                }
                for (side, token) in align_columns(line, &headers, row) {
                    if found.get(side).is_some() || claimed.contains(&(candidate, token)) {
                        continue;
                    }
                    let value = row.percents[token].value;
                    log_debug!(
                        "{} {}% from column of header '{}' in row '{}'",
                        side.as_str(),
                        value,
                        line.text,
                        row.text
                    );
                    claimed.insert((candidate, token));
                    found.set(side, value);
                }
                continue 'headers;
            }
        }
    }

    fn neighbour_line(
        &self,
        lines: &[ScannedLine<'_>],
        side: Side,
        claimed: &HashSet<TokenId>,
    ) -> Option<(TokenId, f64)> {
        for (idx, line) in lines.iter().enumerate() {
            if line.labels(side).is_empty() || line.labelled_for_other_than(side) {
                continue;
            }
            for candidate in self.neighbours(idx) {
                let Some(neighbour) = lines.get(candidate) else {
                    continue;
                };
                if neighbour.percents.is_empty() || neighbour.labelled_for_other_than(side) {
                    continue;
                }
                let free = neighbour.free(candidate, claimed);
                let Some(token) = pick(&neighbour.percents, &free, self.config.ambiguity) else {
                    continue;
                };
                let value = neighbour.percents[token].value;
                log_debug!(
                    "{} {}% from line '{}' next to label line '{}'",
                    side.as_str(),
                    value,
                    neighbour.text,
                    line.text
                );
                return Some(((candidate, token), value));
            }
        }
        None
    }

    /// Line indices within `line_window`: nearer first, below before above.
    fn neighbours(&self, idx: usize) -> Vec<usize> {
        (1..=self.config.line_window)
            .flat_map(|distance| [idx.checked_add(distance), idx.checked_sub(distance)])
            .flatten()
            .collect()
    }
}

impl Default for LineMatcher {
    fn default() -> Self {
        Self::new(ExtractionConfig::default())
    }
}

/// Bytes between a percentage token and a label; zero when they touch or overlap.
fn gap(pct: &PercentMatch, label: &Span) -> usize {
    if pct.end <= label.start {
        label.start - pct.end
    } else if label.end <= pct.start {
        pct.start - label.end
    } else {
        0
    }
}

/// The side whose label is nearest to `pct`. On equal distance a label in
/// front of the number wins over one behind it ("LABEL 52%" reading order).
fn owner(line: &ScannedLine<'_>, pct: &PercentMatch) -> Option<Side> {
    Side::ALL
        .iter()
        .flat_map(|side| {
            line.labels(*side).iter().map(move |label| {
                let behind_number = usize::from(pct.end <= label.start);
                (gap(pct, label) * 2 + behind_number, *side)
            })
        })
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, side)| side)
}

/// Index of the chosen token; `candidates` are indices into `percents` in line order.
fn pick(percents: &[PercentMatch], candidates: &[usize], policy: AmbiguityPolicy) -> Option<usize> {
    let value = |token: &usize| percents[*token].value;
    match policy {
        AmbiguityPolicy::Largest => candidates
            .iter()
            .copied()
            .max_by(|a, b| value(a).total_cmp(&value(b))),
        AmbiguityPolicy::Smallest => candidates
            .iter()
            .copied()
            .min_by(|a, b| value(a).total_cmp(&value(b))),
        AmbiguityPolicy::First => candidates.first().copied(),
    }
}

/// Pair header labels with row tokens. Equal counts pair up in reading
/// order; otherwise the closest relative positions are paired first. Each
/// label and each token is used at most once.
fn align_columns(
    header: &ScannedLine<'_>,
    labels: &[(Side, Span)],
    row: &ScannedLine<'_>,
) -> Vec<(Side, usize)> {
    if labels.len() == row.percents.len() {
        return labels.iter().map(|(side, _)| *side).zip(0..).collect();
    }

    let relative = |start: usize, end: usize, len: usize| (start + end) as f64 / 2.0 / len.max(1) as f64;
    let mut pairs: Vec<(f64, usize, usize)> = Vec::new();
    for (label_idx, (_, span)) in labels.iter().enumerate() {
        let label_pos = relative(span.start, span.end, header.text.len());
        for (token, pct) in row.percents.iter().enumerate() {
            let token_pos = relative(pct.start, pct.end, row.text.len());
            pairs.push(((label_pos - token_pos).abs(), label_idx, token));
        }
    }
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut label_used = vec![false; labels.len()];
    let mut token_used = vec![false; row.percents.len()];
    let mut aligned = Vec::new();
    for (_, label_idx, token) in pairs {
        if label_used[label_idx] || token_used[token] {
            continue;
        }
        label_used[label_idx] = true;
        token_used[token] = true;
        aligned.push((labels[label_idx].0, token));
    }
    aligned
}

/// Three explicit percentages adding up to roughly 100 are read left to right
/// as Player, Tie, Banker, the order of the statistics bar. A line holding
/// exactly three is tried first, then every run of three consecutive tokens
/// across lines, preferring runs whose middle value is the smallest. Only
/// missing sides are filled, and never from a token another side already took.
fn fill_from_triplet(lines: &[ScannedLine<'_>], found: &mut Percentages, claimed: &HashSet<TokenId>) {
    let tokens: Vec<(TokenId, f64)> = lines
        .iter()
        .enumerate()
        .flat_map(|(idx, line)| {
            line.percents
                .iter()
                .enumerate()
                .filter(|(_, pct)| pct.explicit)
                .map(move |(token, pct)| ((idx, token), pct.value))
        })
        .collect();

    let usable = |triplet: &[(TokenId, f64)]| {
        let total: f64 = triplet.iter().map(|(_, value)| value).sum();
        (90.0..=110.0).contains(&total)
            && BAR_ORDER
                .iter()
                .zip(triplet)
                .all(|(side, (token, _))| found.get(*side).is_some() || !claimed.contains(token))
    };

    let same_line = lines.iter().enumerate().find_map(|(idx, _)| {
        let on_line: Vec<(TokenId, f64)> = tokens
            .iter()
            .copied()
            .filter(|((line, _), _)| *line == idx)
            .collect();
        (on_line.len() == 3 && usable(&on_line)).then_some(on_line)
    });

    let chosen = same_line.or_else(|| {
        let mut best: Option<(f64, &[(TokenId, f64)])> = None;
        for window in tokens.windows(3) {
            if !usable(window) {
                continue;
            }
            let smallest = window.iter().map(|(_, value)| *value).fold(f64::MAX, f64::min);
            let score = -(window[1].1 - smallest).abs();
            if best.map_or(true, |(best_score, _)| score > best_score) {
                best = Some((score, window));
            }
        }
        best.map(|(_, window)| window.to_vec())
    });

    let Some(triplet) = chosen else {
        return;
    };
    for (side, (_, value)) in BAR_ORDER.into_iter().zip(triplet) {
        if found.get(side).is_none() {
            found.set(side, value);
        }
    }
    log_debug!("filled missing sides from unlabelled percentage triplet");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher() -> LineMatcher {
        LineMatcher::default()
    }

    #[test]
    fn labelled_lines_fill_all_three_sides() {
        let found = matcher().extract(&["JOGADOR 52%", "BANCA 40%", "EMPATE 8%"]);
        assert_eq!(found.player, Some(52.0));
        assert_eq!(found.banker, Some(40.0));
        assert_eq!(found.tie, Some(8.0));
    }

    #[test]
    fn english_labels_and_mixed_case() {
        let found = matcher().extract(&["Player 61%", "banker 30%"]);
        assert_eq!(found.player, Some(61.0));
        assert_eq!(found.banker, Some(30.0));
        assert_eq!(found.tie, None);
    }

    #[test]
    fn no_labels_means_nothing_found() {
        let found = matcher().extract(&["ROUND 12", "45%", "MENU"]);
        assert!(found.is_empty());
    }

    #[test]
    fn first_qualifying_line_wins() {
        let found = matcher().extract(&["PLAYER 55%", "PLAYER 70%"]);
        assert_eq!(found.player, Some(55.0));
    }

    #[test]
    fn adjacent_value_beats_larger_value() {
        let found = matcher().extract(&["JOGADOR 12%        TOTAL 80%"]);
        assert_eq!(found.player, Some(12.0));
    }

    #[test]
    fn one_line_with_all_labels_uses_adjacency() {
        let found = matcher().extract(&["PLAYER 48% TIE 9% BANKER 43%"]);
        assert_eq!(found.player, Some(48.0));
        assert_eq!(found.tie, Some(9.0));
        assert_eq!(found.banker, Some(43.0));
    }

    #[test]
    fn equidistant_values_fall_back_to_policy() {
        let line = ["30% JOGADOR 52%"];
        assert_eq!(matcher().extract(&line).player, Some(52.0));

        let smallest = LineMatcher::new(ExtractionConfig {
            ambiguity: AmbiguityPolicy::Smallest,
            ..Default::default()
        });
        assert_eq!(smallest.extract(&line).player, Some(30.0));

        let first = LineMatcher::new(ExtractionConfig {
            ambiguity: AmbiguityPolicy::First,
            ..Default::default()
        });
        assert_eq!(first.extract(&line).player, Some(30.0));
    }

    #[test]
    fn distant_values_use_policy_over_whole_line() {
        let found = matcher().extract(&["PLAYER ..........  21% ....... 64%"]);
        assert_eq!(found.player, Some(64.0));
    }

    #[test]
    fn value_on_next_line_is_borrowed() {
        let found = matcher().extract(&["JOGADOR", "52%", "BANCA", "40%", "EMPATE", "8%"]);
        assert_eq!(found.player, Some(52.0));
        assert_eq!(found.banker, Some(40.0));
        assert_eq!(found.tie, Some(8.0));
    }

    #[test]
    fn value_on_previous_line_is_borrowed_when_next_is_missing() {
        let found = matcher().extract(&["61%", "PLAYER"]);
        assert_eq!(found.player, Some(61.0));
    }

    #[test]
    fn neighbour_labelled_for_another_side_is_not_borrowed() {
        let found = matcher().extract(&["PLAYER", "BANKER 40%"]);
        assert_eq!(found.player, None);
        assert_eq!(found.banker, Some(40.0));
    }

    #[test]
    fn window_limits_how_far_to_look() {
        let lines = ["PLAYER", "ROUND", "61%"];
        assert_eq!(matcher().extract(&lines).player, None);

        let wide = LineMatcher::new(ExtractionConfig {
            line_window: 2,
            accept_bare_numbers: false,
            ..Default::default()
        });
        assert_eq!(wide.extract(&lines).player, Some(61.0));
    }

    #[test]
    fn bare_number_next_to_label() {
        assert_eq!(matcher().extract(&["JOGADOR 52"]).player, Some(52.0));

        let strict = LineMatcher::new(ExtractionConfig {
            accept_bare_numbers: false,
            ..Default::default()
        });
        assert_eq!(strict.extract(&["JOGADOR 52"]).player, None);
    }

    #[test]
    fn unlabeled_triplet_fills_missing_sides() {
        let lines = ["PLAYER 47%", "47% 10% 43%"];
        let found = matcher().extract(&lines);
        assert_eq!(found.player, Some(47.0));
        assert_eq!(found.tie, Some(10.0));
        assert_eq!(found.banker, Some(43.0));

        let labelled_only = LineMatcher::new(ExtractionConfig {
            infer_unlabeled_triplet: false,
            ..Default::default()
        });
        assert_eq!(labelled_only.extract(&lines).banker, None);
    }

    #[test]
    fn triplet_must_sum_close_to_hundred() {
        assert!(matcher().extract(&["10% 10% 10%"]).is_empty());
    }

    #[test]
    fn triplet_spanning_lines_is_read_in_bar_order() {
        let found = matcher().extract(&["ROUND 31", "40%", "8%", "52%"]);
        assert_eq!(found.player, Some(40.0));
        assert_eq!(found.tie, Some(8.0));
        assert_eq!(found.banker, Some(52.0));
    }

    #[test]
    fn triplet_prefers_small_middle_value() {
        let found = matcher().extract(&["50% 45% 5% 50%"]);
        assert_eq!(found.player, Some(45.0));
        assert_eq!(found.tie, Some(5.0));
        assert_eq!(found.banker, Some(50.0));
    }

    #[test]
    fn triplet_never_reuses_a_labelled_token() {
        let found = matcher().extract(&["BANKER 40%", "52%", "8%"]);
        assert_eq!(found.banker, Some(40.0));
        assert_eq!(found.player, None);
        assert_eq!(found.tie, None);
    }

    #[test]
    fn header_row_aligns_with_value_row() {
        let found = matcher().extract(&["JOGADOR EMPATE BANCA", "52% 8% 40%"]);
        assert_eq!(found.player, Some(52.0));
        assert_eq!(found.tie, Some(8.0));
        assert_eq!(found.banker, Some(40.0));

        let found = matcher().extract(&["PLAYER TIE BANKER", "40% 8% 52%"]);
        assert_eq!(found.player, Some(40.0));
        assert_eq!(found.tie, Some(8.0));
        assert_eq!(found.banker, Some(52.0));
    }

    #[test]
    fn value_row_above_header_is_aligned_too() {
        let found = matcher().extract(&["61% 9% 30%", "PLAYER TIE BANKER"]);
        assert_eq!(found.player, Some(61.0));
        assert_eq!(found.tie, Some(9.0));
        assert_eq!(found.banker, Some(30.0));
    }

    #[test]
    fn short_value_row_pairs_by_position() {
        let found = matcher().extract(&["PLAYER          TIE          BANKER", "40%                         52%"]);
        assert_eq!(found.player, Some(40.0));
        assert_eq!(found.banker, Some(52.0));
        assert_eq!(found.tie, None);
    }

    #[test]
    fn borrowed_value_goes_to_one_side_only() {
        let found = matcher().extract(&["PLAYER", "52%", "BANKER"]);
        assert_eq!(found.player, Some(52.0));
        assert_eq!(found.banker, None);
    }

    #[test]
    fn payout_ratios_do_not_shadow_statistics() {
        let found = matcher().extract(&["PLAYER 1:1", "TIE 88:1", "PLAYER 52%", "TIE 8%"]);
        assert_eq!(found.player, Some(52.0));
        assert_eq!(found.tie, Some(8.0));
    }

    #[test]
    fn explicit_lines_win_over_earlier_bare_lines() {
        let found = matcher().extract(&["PLAYER 2", "PLAYER 52%"]);
        assert_eq!(found.player, Some(52.0));

        assert_eq!(matcher().extract(&["PLAYER 61"]).player, Some(61.0));
    }
}
