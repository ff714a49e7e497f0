use regex::Regex;

/// One percentage-looking token found in a line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PercentMatch {
    pub value: f64,
    /// Byte offsets of the whole token, `%` included when present.
    pub start: usize,
    pub end: usize,
    /// `true` for `52%`, `false` for a bare `52`.
    pub explicit: bool,
}

/// Finds percentage tokens in OCR or page-text lines.
pub struct PercentScanner {
    explicit: Regex,
    bare: Regex,
}

impl PercentScanner {
    pub fn new() -> Self {
        Self {
            // OCR frequently splits "52 %"; allow one space before the sign.
            explicit: Regex::new(r"(\d{1,3}(?:[.,]\d{1,2})?) ?%").expect("explicit percent pattern"),
            bare: Regex::new(r"\d{1,3}(?:[.,]\d{1,2})?").expect("bare number pattern"),
        }
    }

    /// Explicit `NN%` tokens; when there are none and `accept_bare` is set,
    /// standalone numbers in [0, 100] instead.
    pub fn scan(&self, line: &str, accept_bare: bool) -> Vec<PercentMatch> {
        let explicit: Vec<PercentMatch> = self
            .explicit
            .captures_iter(line)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let number = caps.get(1)?;
                if !standalone(line, number.start(), number.end()) {
                    return None;
                }
                let value = parse_value(number.as_str())?;
                Some(PercentMatch {
                    value,
                    start: whole.start(),
                    end: whole.end(),
                    explicit: true,
                })
            })
            .collect();

        if !explicit.is_empty() || !accept_bare {
            return explicit;
        }

        self.bare
            .find_iter(line)
            .filter(|m| standalone(line, m.start(), m.end()))
            .filter_map(|m| {
                let value = parse_value(m.as_str())?;
                Some(PercentMatch {
                    value,
                    start: m.start(),
                    end: m.end(),
                    explicit: false,
                })
            })
            .collect()
    }
}

impl Default for PercentScanner {
    fn default() -> Self {
        Self::new()
    }
}

/// The number is not glued to more digits or a decimal separator on either
/// side, e.g. the `234` inside `1234%` or the `5` inside `2.5.5`, and is not
/// one half of a payout ratio such as `1:1` or `88:1`.
fn standalone(line: &str, start: usize, end: usize) -> bool {
    let bytes = line.as_bytes();
    let digit_at = |idx: usize| bytes.get(idx).is_some_and(u8::is_ascii_digit);
    let glued = |b: u8| b.is_ascii_digit() || b == b'.' || b == b',';

    let before = start == 0
        || !(glued(bytes[start - 1])
            || (bytes[start - 1] == b':' && start >= 2 && digit_at(start - 2)));
    let after = end == bytes.len()
        || !(bytes[end].is_ascii_digit()
            || (matches!(bytes[end], b'.' | b',' | b':') && digit_at(end + 1)));
    before && after
}

fn parse_value(raw: &str) -> Option<f64> {
    let value: f64 = raw.replace(',', ".").parse().ok()?;
    (0.0..=100.0).contains(&value).then_some(value)
}
