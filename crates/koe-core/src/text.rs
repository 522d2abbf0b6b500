//! Char-boundary-safe text helpers.

/// Return at most `max_chars` characters of `text`, appending `...` when cut.
///
/// Counts Unicode scalar values, not bytes, so multi-byte scripts are never
/// split mid-character.
#[must_use]
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}

/// Number of Unicode scalar values in `text`.
#[must_use]
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_unchanged() {
        assert_eq!(truncate_chars("画面が重い", 60), "画面が重い");
    }

    #[test]
    fn exact_length_is_unchanged() {
        assert_eq!(truncate_chars("abcde", 5), "abcde");
    }

    #[test]
    fn long_text_is_cut_on_char_boundary() {
        let text = "もっと早くしてほしい";
        assert_eq!(truncate_chars(text, 3), "もっと...");
    }

    #[test]
    fn char_len_counts_scalars() {
        assert_eq!(char_len("システム"), 4);
    }
}
