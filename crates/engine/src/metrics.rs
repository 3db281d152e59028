//! Text width estimates in spreadsheet column units.
//!
//! The first 20 characters of a line count 1.3 units each and every
//! character after that counts 1.0. The estimate is tuned for the default
//! proportional font; it only has to be close enough that headings and
//! reference notes don't get clipped.

/// Characters charged at the wide rate.
const WIDE_CHARS: usize = 20;
const WIDE_MULTIPLE: f64 = 1.3;
const NARROW_MULTIPLE: f64 = 1.0;

/// Width of the wide segment: `WIDE_CHARS * WIDE_MULTIPLE`.
const WIDE_WIDTH: f64 = WIDE_CHARS as f64 * WIDE_MULTIPLE;

/// Estimated width of a single line of `length` characters.
pub fn estimate_width_from_length(length: usize) -> f64 {
    let wide = length.min(WIDE_CHARS);
    let narrow = length - wide;
    wide as f64 * WIDE_MULTIPLE + narrow as f64 * NARROW_MULTIPLE
}

/// Estimated width of `text`: the widest of its lines.
pub fn estimate_width(text: &str) -> f64 {
    text.split('\n')
        .map(|line| estimate_width_from_length(line.chars().count()))
        .fold(0.0, f64::max)
}

/// Characters that fit on one line of a column `width` units wide.
pub fn chars_for_width(width: f64) -> usize {
    // small epsilon so exact widths (26.0 -> 20) don't round down
    let chars = if width <= WIDE_WIDTH {
        (width / WIDE_MULTIPLE + 1e-9).floor()
    } else {
        ((width - WIDE_WIDTH) / NARROW_MULTIPLE + 1e-9).floor() + WIDE_CHARS as f64
    };
    chars.max(1.0) as usize
}

/// Word-wrap each line of `text` to fit `width`, joining the result with `\n`.
///
/// Text that already fits is returned unchanged. Words are only broken when a
/// single word is longer than a whole line.
pub fn wrap(text: &str, width: f64) -> String {
    if estimate_width(text) <= width {
        return text.to_string();
    }
    let limit = chars_for_width(width);
    text.split('\n')
        .map(|line| wrap_line(line, limit))
        .collect::<Vec<_>>()
        .join("\n")
}

fn wrap_line(line: &str, limit: usize) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in line.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        // break words that can never fit
        while word.len() > limit {
            if current_len > 0 {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let rest = word.split_off(limit);
            lines.push(word.into_iter().collect());
            word = rest;
        }
        if word.is_empty() {
            continue;
        }
        let needed = if current_len == 0 { word.len() } else { current_len + 1 + word.len() };
        if needed > limit && current_len > 0 {
            lines.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current.extend(word.iter());
        current_len += word.len();
    }
    if current_len > 0 || lines.is_empty() {
        lines.push(current);
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn width_segments() {
        assert_eq!(estimate_width_from_length(0), 0.0);
        assert!((estimate_width_from_length(10) - 13.0).abs() < 1e-9);
        assert!((estimate_width_from_length(20) - 26.0).abs() < 1e-9);
        assert!((estimate_width_from_length(30) - 36.0).abs() < 1e-9);
    }

    #[test]
    fn widest_line_wins() {
        assert!((estimate_width("ab\nabcdefghij") - 13.0).abs() < 1e-9);
        assert_eq!(estimate_width(""), 0.0);
    }

    #[test]
    fn chars_invert_width() {
        assert_eq!(chars_for_width(26.0), 20);
        assert_eq!(chars_for_width(13.0), 10);
        assert_eq!(chars_for_width(36.0), 30);
        assert_eq!(chars_for_width(114.0), 108);
        assert_eq!(chars_for_width(0.5), 1);
    }

    #[test]
    fn wraps_at_word_boundaries() {
        let wrapped = wrap("the quick brown fox jumps over the lazy dog", 13.0);
        assert_eq!(wrapped, "the quick\nbrown fox\njumps over\nthe lazy\ndog");
    }

    #[test]
    fn keeps_existing_lines() {
        let wrapped = wrap("short\nthe quick brown fox jumps", 13.0);
        assert_eq!(wrapped, "short\nthe quick\nbrown fox\njumps");
    }

    #[test]
    fn splits_overlong_words() {
        assert_eq!(wrap("abcdefghijklmnop", 6.5), "abcde\nfghij\nklmno\np");
    }

    proptest! {
        #[test]
        fn text_within_width_is_unchanged(s in "[a-z ]{0,60}") {
            let width = estimate_width(&s);
            prop_assert_eq!(wrap(&s, width), s);
        }

        #[test]
        fn wrapped_lines_fit(words in prop::collection::vec("[a-z]{1,12}", 1..20), width in 16.0f64..60.0) {
            let text = words.join(" ");
            let wrapped = wrap(&text, width);
            let limit = chars_for_width(width);
            for line in wrapped.split('\n') {
                prop_assert!(line.chars().count() <= limit);
            }
            // same words in the same order
            let rejoined: Vec<&str> = wrapped.split_whitespace().collect();
            prop_assert_eq!(rejoined, words.iter().map(String::as_str).collect::<Vec<_>>());
        }
    }
}
