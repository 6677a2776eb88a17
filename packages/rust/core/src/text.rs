//! Char-boundary-safe text helpers for prompts and log previews.

/// The first `max_chars` characters of `s`.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Single-line preview of `s`, at most `max_chars` characters plus an
/// ellipsis when cut.
pub fn preview(s: &str, max_chars: usize) -> String {
    let flat = s.split_whitespace().collect::<Vec<_>>().join(" ");
    let cut = truncate_chars(&flat, max_chars);
    if cut.len() < flat.len() {
        format!("{cut}...")
    } else {
        flat
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("città vecchia", 5), "città");
        assert_eq!(truncate_chars("短い歌詞です", 2), "短い");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("abc", 0), "");
    }

    #[test]
    fn preview_flattens_and_marks_cuts() {
        assert_eq!(preview("one\ntwo\n\nthree", 50), "one two three");
        assert_eq!(preview("una mattina mi son svegliato", 11), "una mattina...");
    }
}
