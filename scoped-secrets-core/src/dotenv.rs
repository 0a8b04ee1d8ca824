//! Minimal dotenv assignment parser.
//!
//! Accepts `NAME=value`, `NAME="value"`, `NAME='value'` and an optional `export `
//! prefix. Blank lines and `#` comments are skipped. Double quoted values honour
//! `\n`, `\r`, `\t`, `\"` and `\\` escapes; single quoted values are literal;
//! unquoted values end at the first ` #`.

use crate::errors::{DecryptError, DecryptResult};

/// Parses `src` into `(name, value)` pairs in source order.
pub fn parse(src: &str) -> DecryptResult<Vec<(String, String)>> {
    let mut entries = Vec::new();
    for (index, line) in src.lines().enumerate() {
        let line_no = index + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let assignment = trimmed
            .strip_prefix("export ")
            .map(str::trim_start)
            .unwrap_or(trimmed);
        let (name, raw) = assignment.split_once('=').ok_or_else(|| DecryptError::Parse {
            line: line_no,
            reason: "expected NAME=value".into(),
        })?;
        let name = name.trim();
        if !is_valid_name(name) {
            return Err(DecryptError::Parse {
                line: line_no,
                reason: format!("invalid name `{name}`"),
            });
        }
        let value = parse_value(raw.trim(), line_no)?;
        entries.push((name.to_string(), value));
    }
    Ok(entries)
}

/// Renders a single double quoted assignment that [`parse`] reads back verbatim.
pub fn assignment(name: &str, value: &str) -> String {
    let mut out = String::with_capacity(name.len() + value.len() + 3);
    out.push_str(name);
    out.push_str("=\"");
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
}

fn parse_value(raw: &str, line: usize) -> DecryptResult<String> {
    let unterminated = |quote: char| DecryptError::Parse {
        line,
        reason: format!("unterminated {quote} quoted value"),
    };

    if let Some(rest) = raw.strip_prefix('"') {
        let mut value = String::with_capacity(rest.len());
        let mut chars = rest.chars();
        while let Some(c) = chars.next() {
            match c {
                '"' => return Ok(value),
                '\\' => match chars.next() {
                    Some('n') => value.push('\n'),
                    Some('r') => value.push('\r'),
                    Some('t') => value.push('\t'),
                    Some(other) => value.push(other),
                    None => return Err(unterminated('"')),
                },
                other => value.push(other),
            }
        }
        return Err(unterminated('"'));
    }

    if let Some(rest) = raw.strip_prefix('\'') {
        return rest
            .find('\'')
            .map(|end| rest[..end].to_string())
            .ok_or_else(|| unterminated('\''));
    }

    let value = match raw.find(" #") {
        Some(pos) => &raw[..pos],
        None => raw,
    };
    Ok(value.trim_end().to_string())
}
