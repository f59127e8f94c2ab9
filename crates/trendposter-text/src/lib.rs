//! Text normalization shared by the scraper, the poster and the file naming.

/// Title used on the poster when the article has none.
pub const FALLBACK_TITLE: &str = "Berita Trending";

/// Bodies at most this many characters are used verbatim.
pub const MAX_BODY_CHARS: usize = 300;

/// Characters not allowed in file names on common filesystems.
const UNSAFE_FILENAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

fn is_kept_char(c: char) -> bool {
    matches!(c,
        '\u{20}'..='\u{7E}'
        | '\u{A0}'..='\u{24F}'
        | '\u{1E00}'..='\u{1EFF}'
    )
}

/// Normalize scraped text for rendering.
///
/// Typographic punctuation is folded to ASCII, anything outside the Latin
/// ranges the poster fonts cover is dropped, and whitespace is collapsed.
pub fn clean_text(text: &str) -> String {
    let mut folded = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\u{2013}' | '\u{2014}' => folded.push('-'),
            '\u{A0}' => folded.push(' '),
            '\u{200B}' => {}
            '\u{2026}' => folded.push_str("..."),
            // Whitespace is collapsed below, so keep it regardless of range.
            c if c.is_whitespace() => folded.push(' '),
            c if is_kept_char(c) => folded.push(c),
            _ => {}
        }
    }

    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Derive a file-name stem from a URL.
///
/// Uses the last path segment without its extension, falling back to the host
/// (dots replaced) for bare domains.
pub fn safe_filename_from_url(raw: &str) -> String {
    let parsed = url::Url::parse(raw).ok();

    let segment = parsed
        .as_ref()
        .map(|u| u.path().trim_end_matches('/'))
        .unwrap_or_else(|| raw.trim_end_matches('/'))
        .rsplit('/')
        .next()
        .unwrap_or_default();

    let stem = match segment.rfind('.') {
        // A leading dot is a hidden file, not an extension.
        Some(pos) if 0 < pos => &segment[..pos],
        _ => segment,
    };

    let name = if stem.is_empty() {
        parsed
            .as_ref()
            .and_then(|u| u.host_str())
            .unwrap_or_default()
            .replace('.', "_")
    } else {
        stem.to_string()
    };

    name.replace(UNSAFE_FILENAME_CHARS, "_")
        .trim()
        .replace(' ', "_")
}

/// Title to render, with a fallback for articles without one.
pub fn poster_title(title: Option<&str>) -> &str {
    match title {
        Some(t) if !t.trim().is_empty() => t,
        _ => FALLBACK_TITLE,
    }
}

fn ends_with_terminal(s: &str) -> bool {
    s.ends_with(['.', '!', '?'])
}

/// Split after `.`, `!` or `?` followed by whitespace.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        let Some(&(next_i, next_c)) = chars.peek() else {
            break;
        };
        if !next_c.is_whitespace() {
            continue;
        }
        sentences.push(&text[start..=i]);
        let mut resume = next_i;
        while let Some(&(j, w)) = chars.peek() {
            if !w.is_whitespace() {
                resume = j;
                break;
            }
            chars.next();
            resume = j + w.len_utf8();
        }
        start = resume;
    }
    sentences.push(&text[start..]);
    sentences
}

/// Build the poster body from the first paragraphs of an article.
///
/// Falls back to `description` when there are no paragraphs. Long bodies are
/// cut at [`MAX_BODY_CHARS`] and backed off to the last full stop; a body that
/// still ends mid-sentence is replaced by the last two sentences of the
/// source text.
pub fn summarize_body(paragraphs: &[String], description: Option<&str>) -> String {
    let body = if paragraphs.is_empty() {
        description.unwrap_or_default().to_string()
    } else {
        paragraphs
            .iter()
            .take(2)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    };
    let body = body.trim();

    let mut summary = if body.chars().count() < MAX_BODY_CHARS {
        body.to_string()
    } else {
        let truncated: String = body.chars().take(MAX_BODY_CHARS).collect();
        if ends_with_terminal(&truncated) {
            truncated.trim().to_string()
        } else {
            match truncated.rfind('.') {
                Some(pos) => truncated[..=pos].trim().to_string(),
                None => truncated.trim().to_string(),
            }
        }
    };

    if summary.chars().count() < MAX_BODY_CHARS && !ends_with_terminal(&summary) {
        let sentences = split_sentences(body);
        if let [.., second_last, last] = sentences.as_slice() {
            summary = format!("{} {}", second_last.trim(), last.trim());
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_text_folds_typography() {
        assert_eq!(
            clean_text("Hari ini \u{2013} besok\u{2026} \u{200B}ya\u{A0}tidak"),
            "Hari ini - besok... ya tidak"
        );
    }

    #[test]
    fn clean_text_drops_unsupported_scripts() {
        assert_eq!(clean_text("Café 東京 news 🚀"), "Café news");
    }

    #[test]
    fn clean_text_collapses_whitespace() {
        assert_eq!(clean_text("  a \n\t b   c  "), "a b c");
        assert_eq!(clean_text(""), "");
    }

    #[test]
    fn safe_filename_uses_last_segment_without_extension() {
        assert_eq!(
            safe_filename_from_url("https://news.test/2024/05/some-story.html"),
            "some-story"
        );
        assert_eq!(
            safe_filename_from_url("https://news.test/read/some-story/"),
            "some-story"
        );
    }

    #[test]
    fn safe_filename_falls_back_to_host() {
        assert_eq!(safe_filename_from_url("https://www.news.test/"), "www_news_test");
    }

    #[test]
    fn safe_filename_replaces_unsafe_chars() {
        assert_eq!(
            safe_filename_from_url("https://news.test/a%20b:c"),
            "a%20b_c"
        );
    }

    #[test]
    fn poster_title_falls_back() {
        assert_eq!(poster_title(Some("Judul")), "Judul");
        assert_eq!(poster_title(Some("  ")), FALLBACK_TITLE);
        assert_eq!(poster_title(None), FALLBACK_TITLE);
    }

    #[test]
    fn summarize_short_body_is_kept() {
        let paragraphs = vec!["First sentence.".to_string(), "Second one.".to_string()];
        assert_eq!(
            summarize_body(&paragraphs, None),
            "First sentence. Second one."
        );
    }

    #[test]
    fn summarize_uses_only_two_paragraphs() {
        let paragraphs = vec!["A.".to_string(), "B.".to_string(), "C.".to_string()];
        assert_eq!(summarize_body(&paragraphs, None), "A. B.");
    }

    #[test]
    fn summarize_falls_back_to_description() {
        assert_eq!(summarize_body(&[], Some("Desc here.")), "Desc here.");
        assert_eq!(summarize_body(&[], None), "");
    }

    #[test]
    fn summarize_long_body_backs_off_to_full_stop() {
        let sentence = "This sentence is exactly fifty characters long ok.";
        assert_eq!(sentence.chars().count(), 50);
        let paragraphs = vec![format!("{} tail without stop", sentence.repeat(6))];
        let summary = summarize_body(&paragraphs, None);
        assert_eq!(summary, sentence.repeat(6).trim());
        assert!(summary.chars().count() <= MAX_BODY_CHARS);
    }

    #[test]
    fn summarize_unterminated_uses_last_two_sentences() {
        let paragraphs = vec!["One. Two! Three without end".to_string()];
        assert_eq!(summarize_body(&paragraphs, None), "Two! Three without end");
    }

    #[test]
    fn summarize_counts_chars_not_bytes() {
        let paragraphs = vec!["é".repeat(400)];
        let summary = summarize_body(&paragraphs, None);
        assert_eq!(summary.chars().count(), MAX_BODY_CHARS);
    }

    #[test]
    fn split_sentences_keeps_punctuation() {
        assert_eq!(split_sentences("A. B!  C? d"), vec!["A.", "B!", "C?", "d"]);
        assert_eq!(split_sentences("no stop"), vec!["no stop"]);
    }
}
