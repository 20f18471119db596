//! Helpers for producing C source text.

/// Quote `s` as a C string literal.
///
/// Non-printable and non-ASCII bytes are written as octal escapes so the
/// literal keeps the exact byte sequence.
pub fn c_string_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for byte in s.bytes() {
        match byte {
            b'"' => out.push_str("\\\""),
            b'\\' => out.push_str("\\\\"),
            b'\n' => out.push_str("\\n"),
            b'\t' => out.push_str("\\t"),
            b'\r' => out.push_str("\\r"),
            // `??` starts a trigraph
            b'?' => out.push_str("\\?"),
            0x20..=0x7e => out.push(char::from(byte)),
            _ => out.push_str(&format!("\\{byte:03o}")),
        }
    }
    out.push('"');
    out
}

/// Turn an arbitrary Ruby name into a C identifier fragment.
///
/// Operator characters get readable spellings (`+` → `plus`), anything else
/// outside `[A-Za-z0-9_]` becomes `_`. The result is never empty and never
/// starts with a digit.
pub fn mangle(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut after_operator = false;
    for c in name.chars() {
        let part = match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '_' => {
                if after_operator && c != '_' {
                    out.push('_');
                }
                after_operator = false;
                out.push(c);
                continue;
            }
            '+' => "plus",
            '-' => "minus",
            '*' => "mul",
            '/' => "div",
            '%' => "mod",
            '<' => "lt",
            '>' => "gt",
            '=' => "eq",
            '!' => "bang",
            '?' => "p",
            '[' => "aref",
            ']' => "",
            '~' => "tilde",
            '&' => "and",
            '|' => "or",
            '^' => "xor",
            '@' => "at",
            '$' => "gv",
            _ => {
                out.push('_');
                after_operator = false;
                continue;
            }
        };
        if !out.is_empty() && !out.ends_with('_') && !part.is_empty() {
            out.push('_');
        }
        out.push_str(part);
        after_operator = !part.is_empty();
    }
    if out.is_empty() || out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

/// Whether `name` is usable as a C identifier as-is.
pub fn is_c_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
