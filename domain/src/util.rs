//! Text helpers for log lines and transcripts.

use std::borrow::Cow;

/// Cut `s` to at most `max_bytes`, backing off to a UTF-8 character boundary.
pub fn truncate_str(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Single-line preview: newlines flattened, cut to `max_bytes` with a
/// trailing `...` when anything was dropped.
pub fn preview(s: &str, max_bytes: usize) -> Cow<'_, str> {
    let cut = truncate_str(s, max_bytes);
    let truncated = cut.len() < s.len();
    if !truncated && !cut.contains('\n') {
        return Cow::Borrowed(cut);
    }
    let mut out = cut.replace('\n', " ");
    if truncated {
        out.push_str("...");
    }
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_keeps_short_input() {
        assert_eq!(truncate_str("list files", 64), "list files");
        assert_eq!(truncate_str("", 4), "");
    }

    #[test]
    fn test_truncate_backs_off_to_char_boundary() {
        // 'é' is two bytes
        let s = "café au lait";
        assert_eq!(truncate_str(s, 4), "caf");
        assert_eq!(truncate_str(s, 5), "café");
    }

    #[test]
    fn test_preview() {
        assert!(matches!(preview("short", 10), Cow::Borrowed("short")));
        assert_eq!(preview("line one\nline two", 64), "line one line two");
        assert_eq!(preview("[FILE] a.txt\n[FILE] b.txt", 12), "[FILE] a.txt...");
    }
}
