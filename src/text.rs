//! Greedy word wrapping

use crate::surface::{Font, TextMetrics};

/// Break `text` into lines narrower than `max_width`.
///
/// Explicit newlines always break; an empty paragraph yields an empty line, but a
/// single trailing newline does not. Words are never split: a word wider than
/// `max_width` gets a line of its own. Runs of spaces collapse to one.
pub fn wrap_text(metrics: &dyn TextMetrics, font: &Font, max_width: f32, text: &str) -> Vec<String> {
    let mut lines = Vec::new();
    if text.is_empty() {
        return lines;
    }

    let text = text.strip_suffix('\n').unwrap_or(text);
    for paragraph in text.split('\n') {
        let mut line = String::new();
        for word in paragraph.split(' ').filter(|w| !w.is_empty()) {
            if line.is_empty() {
                line.push_str(word);
                continue;
            }

            let candidate = format!("{line} {word}");
            if metrics.measure_text(font, &candidate) < max_width {
                line = candidate;
            } else {
                lines.push(std::mem::replace(&mut line, word.to_string()));
            }
        }
        lines.push(line);
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::RecordingSurface;

    fn wrap(max_width: f32, text: &str) -> Vec<String> {
        // 6 units per character
        let metrics = RecordingSurface::new(640.0, 480.0);
        wrap_text(&metrics, &Font::default(), max_width, text)
    }

    #[test]
    fn test_greedy_fill() {
        assert_eq!(wrap(60.0, "the quick brown fox"), vec!["the quick", "brown fox"]);
    }

    #[test]
    fn test_width_must_be_strictly_less() {
        // "ab cd" is exactly 30 wide
        assert_eq!(wrap(30.0, "ab cd"), vec!["ab", "cd"]);
        assert_eq!(wrap(30.1, "ab cd"), vec!["ab cd"]);
    }

    #[test]
    fn test_long_word_gets_own_line() {
        assert_eq!(
            wrap(30.0, "a supercalifragilistic b"),
            vec!["a", "supercalifragilistic", "b"]
        );
    }

    #[test]
    fn test_newlines() {
        assert_eq!(wrap(600.0, "one\n\ntwo\n"), vec!["one", "", "two"]);
        assert_eq!(wrap(600.0, "one  two"), vec!["one two"]);
        assert!(wrap(600.0, "").is_empty());
    }
}
