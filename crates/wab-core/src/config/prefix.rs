use std::sync::OnceLock;

use regex::Regex;

static CLASS_RE: OnceLock<Regex> = OnceLock::new();
static NON_CAPTURING_RE: OnceLock<Regex> = OnceLock::new();
static CAPTURING_RE: OnceLock<Regex> = OnceLock::new();

fn is_regex_meta(c: char) -> bool {
    matches!(
        c,
        '\\' | '^' | '$' | '.' | '|' | '?' | '*' | '+' | '(' | ')' | '[' | ']' | '{' | '}'
    )
}

/// First member of a bracketed class: `[!/.]` -> `!`.
fn class_re() -> &'static Regex {
    CLASS_RE.get_or_init(|| Regex::new(r"\[\^?(\\.|[^\]\\])").expect("valid regex"))
}

/// First alternative of `(?:a|b)`.
fn non_capturing_re() -> &'static Regex {
    NON_CAPTURING_RE
        .get_or_init(|| Regex::new(r"\(\?:((?:\\.|[^|)\\])+)").expect("valid regex"))
}

/// First alternative of `(a|b)`; a group opening with `?` is not capturing.
fn capturing_re() -> &'static Regex {
    CAPTURING_RE.get_or_init(|| {
        Regex::new(r"\(((?:\\.|[^?|)\\])(?:\\.|[^|)\\])*)").expect("valid regex")
    })
}

/// A single human-readable prefix example for help texts.
///
/// The configured prefix may be a plain string (`"."`) or a regular expression
/// (`"[.!#]"`, `"(?:!|/)"`). Plain strings come back verbatim; for patterns the
/// first usable literal is extracted. Falls back to the raw value.
pub fn display_prefix(raw: &str) -> String {
    if !raw.chars().any(is_regex_meta) {
        return raw.to_string();
    }

    for re in [class_re(), non_capturing_re(), capturing_re()] {
        if let Some(m) = re.captures(raw).and_then(|c| c.get(1)) {
            let lit = unescape(m.as_str());
            if !lit.is_empty() {
                return lit;
            }
        }
    }

    if let Some(c) = first_literal(raw) {
        return c.to_string();
    }

    raw.to_string()
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// First non-metacharacter. Escaped punctuation (`\.`) counts as a literal;
/// escaped letters (`\s`, `\d`) are classes and are skipped.
fn first_literal(raw: &str) -> Option<char> {
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(next) if next.is_ascii_punctuation() => return Some(next),
                _ => continue,
            }
        }
        if !is_regex_meta(c) {
            return Some(c);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_prefix_is_returned_verbatim() {
        assert_eq!(display_prefix("/"), "/");
        assert_eq!(display_prefix("!"), "!");
        assert_eq!(display_prefix("bot "), "bot ");
    }

    #[test]
    fn character_class_wins() {
        assert_eq!(display_prefix("[!/.]"), "!");
        assert_eq!(display_prefix("^[.!#]"), ".");
        assert_eq!(display_prefix(r"[\.!]"), ".");
    }

    #[test]
    fn groups_yield_their_first_alternative() {
        assert_eq!(display_prefix("(?:!|/)"), "!");
        assert_eq!(display_prefix("^(#|!)"), "#");
        assert_eq!(display_prefix("(?:bot|b)\\s"), "bot");
    }

    #[test]
    fn falls_back_to_first_literal() {
        assert_eq!(display_prefix(r"^\s*!"), "!");
        assert_eq!(display_prefix(r"^\."), ".");
    }

    #[test]
    fn only_metacharacters_return_raw_value() {
        assert_eq!(display_prefix("."), ".");
        assert_eq!(display_prefix("^$"), "^$");
    }
}
