//! Greedy word wrapping against a pixel width.

/// Wrap `text` into lines no wider than `max_width` as reported by `measure`.
///
/// Words are never split: a single word wider than `max_width` occupies its
/// own, overflowing line. Whitespace between words is normalized to one space.
pub fn wrap<M>(text: &str, measure: M, max_width: u32) -> Vec<String>
where
    M: Fn(&str) -> u32,
{
    let mut lines = Vec::new();
    let mut line = String::new();

    for word in text.split_whitespace() {
        let candidate = if line.is_empty() {
            word.to_owned()
        } else {
            format!("{line} {word}")
        };

        if measure(&candidate) <= max_width {
            line = candidate;
        } else if line.is_empty() {
            // Nothing to close yet; the oversized word becomes the line.
            line = candidate;
        } else {
            lines.push(std::mem::replace(&mut line, word.to_owned()));
        }
    }

    if !line.is_empty() {
        lines.push(line);
    }

    lines
}

/// Vertical space taken by `line_count` lines of `font_size` pixels, each
/// followed by `spacing`.
pub fn block_height(line_count: usize, font_size: u32, spacing: u32) -> u32 {
    u32::try_from(line_count)
        .unwrap_or(u32::MAX)
        .saturating_mul(font_size.saturating_add(spacing))
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    /// Ten pixels per character, spaces included.
    fn mono(s: &str) -> u32 {
        s.chars().count() as u32 * 10
    }

    #[test]
    fn empty_text_has_no_lines() {
        assert!(wrap("", mono, 100).is_empty());
        assert!(wrap("   \n\t ", mono, 100).is_empty());
    }

    #[test]
    fn fills_lines_up_to_max_width() {
        assert_eq!(wrap("aaa bbb ccc", mono, 70), vec!["aaa bbb", "ccc"]);
        assert_eq!(wrap("aaa bbb ccc", mono, 110), vec!["aaa bbb ccc"]);
    }

    #[test]
    fn long_word_gets_its_own_line() {
        assert_eq!(
            wrap("a supercalifragilistic b", mono, 50),
            vec!["a", "supercalifragilistic", "b"]
        );
        assert_eq!(
            wrap("supercalifragilistic", mono, 50),
            vec!["supercalifragilistic"]
        );
    }

    #[test]
    fn collapses_inner_whitespace() {
        assert_eq!(wrap("a  \n b", mono, 1000), vec!["a b"]);
    }

    #[test]
    fn block_height_counts_spacing_per_line() {
        assert_eq!(block_height(0, 40, 5), 0);
        assert_eq!(block_height(3, 40, 5), 135);
    }

    proptest! {
        #[test]
        fn wrapping_preserves_words(
            words in prop::collection::vec("[a-zA-Z0-9]{1,15}", 0..40),
            max_width in 0u32..300,
        ) {
            let text = words.join(" ");
            let lines = wrap(&text, mono, max_width);

            prop_assert_eq!(lines.join(" "), text);
            for line in &lines {
                // Only lines made of a single oversized word may overflow.
                prop_assert!(mono(line) <= max_width || !line.contains(' '));
            }
        }

        #[test]
        fn wrapping_is_deterministic(
            text in "[a-z ]{0,80}",
            max_width in 0u32..300,
        ) {
            prop_assert_eq!(wrap(&text, mono, max_width), wrap(&text, mono, max_width));
        }
    }
}
