//! JSON with comments and trailing commas.
//!
//! The config file is meant to be edited by hand, so it may carry `//` and `/* */`
//! comments plus trailing commas. Those are accepted on input only: `serialize`
//! always emits strict JSON, so comments do not survive a rewrite.

use std::{fs, path::Path};

use serde_json::{Map, Value};

use crate::{errors::Error, Result};

/// Remove `//` line comments and `/* */` block comments outside string literals.
///
/// Newlines inside comments are kept so parse errors still point at the right line.
pub fn strip_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut in_string = false;

    while let Some(ch) = chars.next() {
        if in_string {
            out.push(ch);
            match ch {
                '\\' => {
                    // Escaped char is copied verbatim, including another backslash.
                    if let Some(next) = chars.next() {
                        out.push(next);
                    }
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => {
                in_string = true;
                out.push(ch);
            }
            '/' if chars.peek() == Some(&'/') => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for c in chars.by_ref() {
                    if prev == '*' && c == '/' {
                        break;
                    }
                    if c == '\n' {
                        out.push('\n');
                    }
                    prev = c;
                }
            }
            other => out.push(other),
        }
    }

    out
}

/// Remove commas that directly precede `]` or `}` (whitespace in between is allowed).
pub fn strip_trailing_commas(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut i = 0usize;

    while i < chars.len() {
        let ch = chars[i];

        if in_string {
            out.push(ch);
            if ch == '\\' {
                if let Some(&next) = chars.get(i + 1) {
                    out.push(next);
                    i += 1;
                }
            } else if ch == '"' {
                in_string = false;
            }
            i += 1;
            continue;
        }

        match ch {
            '"' => {
                in_string = true;
                out.push(ch);
            }
            ',' => {
                let next = chars[i + 1..].iter().find(|c| !c.is_whitespace());
                if !matches!(next, Some(']') | Some('}')) {
                    out.push(ch);
                }
            }
            other => out.push(other),
        }
        i += 1;
    }

    out
}

/// Strict-parse `text` after stripping comments and trailing commas.
pub fn parse(text: &str) -> Result<Value> {
    let cleaned = strip_trailing_commas(&strip_comments(text));
    serde_json::from_str(&cleaned).map_err(|e| Error::Parse {
        line: e.line(),
        column: e.column(),
        message: e.to_string(),
    })
}

/// Load a document from disk. A missing or blank file is an empty object.
pub fn load(path: &Path) -> Result<Value> {
    if !path.exists() {
        return Ok(Value::Object(Map::new()));
    }
    let txt = fs::read_to_string(path)?;
    if txt.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }
    parse(&txt)
}

/// Render `value` as pretty, comment-free JSON with a trailing newline.
pub fn serialize(value: &Value) -> Result<String> {
    let mut txt = serde_json::to_string_pretty(value)?;
    txt.push('\n');
    Ok(txt)
}

/// Write `serialize(value)` to `path`, creating parent directories on demand.
pub fn save(path: &Path, value: &Value) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, serialize(value)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::PathBuf;

    fn tmp(prefix: &str) -> PathBuf {
        let ts = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let pid = std::process::id();
        PathBuf::from(format!("/tmp/wab-jsonc-{prefix}-{pid}-{ts}"))
    }

    #[test]
    fn strips_line_and_block_comments() {
        let raw = "{\n  // owner\n  \"a\": 1, /* inline */ \"b\": 2\n}";
        let out = strip_comments(raw);
        assert!(!out.contains("owner"));
        assert!(!out.contains("inline"));
        assert_eq!(parse(raw).unwrap(), json!({"a": 1, "b": 2}));
    }

    #[test]
    fn comment_markers_inside_strings_are_kept() {
        let raw = r#"{"url": "https://example.com/a", "glob": "/* not a comment */"} // tail"#;
        let out = strip_comments(raw);
        assert!(out.contains("https://example.com/a"));
        assert!(out.contains("/* not a comment */"));
        assert!(!out.contains("tail"));
    }

    #[test]
    fn escaped_quotes_and_backslashes_do_not_end_strings() {
        let raw = r#"{"q": "say \"//hi\"", "p": "C:\\", "c": 1 // gone
}"#;
        let v = parse(raw).unwrap();
        assert_eq!(v["q"], json!("say \"//hi\""));
        assert_eq!(v["p"], json!("C:\\"));
        assert_eq!(v["c"], json!(1));
    }

    #[test]
    fn block_comment_keeps_line_numbers() {
        let raw = "/* one\ntwo\nthree */\n{ oops }";
        match parse(raw) {
            Err(Error::Parse { line, .. }) => assert_eq!(line, 4),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn trailing_commas_are_removed_outside_strings() {
        let raw = "{\"a\": [1, 2, ], \"s\": \",]\",\n}";
        assert_eq!(parse(raw).unwrap(), json!({"a": [1, 2], "s": ",]"}));
    }

    #[test]
    fn residual_syntax_errors_fail() {
        assert!(matches!(parse("{\"a\": }"), Err(Error::Parse { .. })));
    }

    #[test]
    fn missing_file_loads_as_empty_document() {
        let p = tmp("missing").join("nope.jsonc");
        assert_eq!(load(&p).unwrap(), json!({}));
    }

    #[test]
    fn save_creates_parents_and_drops_comments() {
        let dir = tmp("save");
        let p = dir.join("nested/config.jsonc");
        let v = parse("{\n  // note\n  \"x\": true,\n}").unwrap();
        save(&p, &v).unwrap();

        let txt = fs::read_to_string(&p).unwrap();
        assert!(!txt.contains("note"));
        assert!(txt.ends_with('\n'));
        assert_eq!(load(&p).unwrap(), json!({"x": true}));
    }
}
