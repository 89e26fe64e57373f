pub const DEFAULT_MAX_LEN: usize = 1000;
pub const MAX_IMPORT_LEN: usize = 100_000;

fn is_control(c: char) -> bool {
    matches!(c, '\u{0}'..='\u{1f}' | '\u{7f}')
}

/// Strip control characters, trim, and bound to `max_len` characters.
///
/// Idempotent: whitespace exposed by the cut is trimmed too.
pub fn sanitize(text: &str, max_len: usize) -> String {
    if text.is_empty() {
        return String::new();
    }
    let stripped: String = text.chars().filter(|c| !is_control(*c)).collect();
    bound(stripped.trim(), max_len)
}

/// Multi-line variant of [`sanitize`]: keeps `\n` and `\t`, folds `\r\n`
/// and lone `\r` into `\n`.
pub fn sanitize_block(text: &str, max_len: usize) -> String {
    if text.is_empty() {
        return String::new();
    }
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    let stripped: String = normalized
        .chars()
        .filter(|c| matches!(c, '\n' | '\t') || !is_control(*c))
        .collect();
    bound(stripped.trim(), max_len)
}

fn bound(trimmed: &str, max_len: usize) -> String {
    match trimmed.char_indices().nth(max_len) {
        Some((cut, _)) => trimmed[..cut].trim_end().to_string(),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_empty() {
        assert_eq!(sanitize("", DEFAULT_MAX_LEN), "");
        assert_eq!(sanitize("   ", DEFAULT_MAX_LEN), "");
    }

    #[test]
    fn strips_controls_and_trims() {
        assert_eq!(sanitize("  a\u{0}b\u{7f}c\t\n ", DEFAULT_MAX_LEN), "abc");
    }

    #[test]
    fn truncates_by_chars_not_bytes() {
        assert_eq!(sanitize("りんごバナナ", 3), "りんご");
    }

    #[test]
    fn preserves_non_latin_text() {
        let s = "英単語 → りんご 😀";
        assert_eq!(sanitize(s, DEFAULT_MAX_LEN), s);
    }

    #[test]
    fn idempotent_when_cut_lands_on_space() {
        let once = sanitize("ab cd", 3);
        assert_eq!(once, "ab");
        assert_eq!(sanitize(&once, 3), once);
    }

    #[test]
    fn idempotent_over_samples() {
        for s in ["\u{1}  x  y\u{2} ", "  漢字\u{7f}かな ", "a\u{1f}", "", "     z"] {
            for n in [1, 2, 4, 1000] {
                let once = sanitize(s, n);
                assert_eq!(sanitize(&once, n), once, "input {s:?} len {n}");
            }
        }
    }

    #[test]
    fn block_keeps_lines_and_tabs() {
        assert_eq!(
            sanitize_block(" a\tb\r\nc\u{0}d\re \n", MAX_IMPORT_LEN),
            "a\tb\ncd\ne"
        );
    }
}
