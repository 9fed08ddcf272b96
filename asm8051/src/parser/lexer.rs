//! Line splitting: comments, labels, pseudo-ops and instructions

use crate::error::ErrorKind;
use crate::opcodes::OPCODES;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Statement {
    /// `ORG value` / `.ORG value`
    Org(String),
    /// `NAME EQU value`
    Equ { name: String, value: String },
    /// Mnemonic and operand text, label and comment removed.
    Instruction(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Line {
    pub label: Option<String>,
    pub statement: Option<Statement>,
}

/// Characters of `text` outside character literals, with their byte offsets.
///
/// A complete `'c'` literal is skipped as a unit, so the middle of `'''` or
/// `';'` is never seen. Any other quote opens a literal that runs to the next quote.
fn unquoted_chars(text: &str) -> impl Iterator<Item = (usize, char)> + '_ {
    let mut chars = text.char_indices();
    let mut in_quote = false;
    std::iter::from_fn(move || {
        while let Some((i, ch)) = chars.next() {
            if ch != '\'' {
                if !in_quote {
                    return Some((i, ch));
                }
                continue;
            }
            if in_quote {
                in_quote = false;
                continue;
            }
            let mut ahead = chars.clone();
            match (ahead.next(), ahead.next()) {
                (Some(_), Some((_, '\''))) => chars = ahead,
                _ => in_quote = true,
            }
        }
        None
    })
}

/// Drop everything from the first `;` that is not inside a character literal.
pub fn strip_comment(line: &str) -> &str {
    match unquoted_chars(line).find(|&(_, ch)| ch == ';') {
        Some((i, _)) => &line[..i],
        None => line,
    }
}

/// Split operand text on commas outside character literals.
pub fn split_operands(text: &str) -> Vec<String> {
    let mut operands = Vec::new();
    let mut start = 0;
    for (i, _) in unquoted_chars(text).filter(|&(_, ch)| ch == ',') {
        operands.push(text[start..i].trim().to_string());
        start = i + 1;
    }
    operands.push(text[start..].trim().to_string());
    operands
}

pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn is_reserved(word: &str) -> bool {
    let upper = word.to_ascii_uppercase();
    matches!(upper.as_str(), "ORG" | ".ORG" | "EQU") || OPCODES.has_mnemonic(&upper)
}

fn find_unquoted(text: &str, needle: char) -> Option<usize> {
    unquoted_chars(text).find(|&(_, ch)| ch == needle).map(|(i, _)| i)
}

/// Split off a leading label. Returns the label and the remaining text.
fn split_label(code: &str) -> Result<(Option<String>, &str), ErrorKind> {
    if let Some(pos) = find_unquoted(code, ':') {
        let prefix = code[..pos].trim();
        if is_identifier(prefix) {
            return Ok((Some(prefix.to_string()), &code[pos + 1..]));
        }
        if !prefix.is_empty() && !prefix.contains(char::is_whitespace) {
            return Err(ErrorKind::Syntax(format!("invalid label '{}'", prefix)));
        }
    }

    // Old style: a name in column 0 terminated by a tab
    if let Some(tab) = code.find('\t') {
        let head = &code[..tab];
        let tail = &code[tab + 1..];
        let next_is_equ = tail
            .split_whitespace()
            .next()
            .is_some_and(|w| w.eq_ignore_ascii_case("EQU"));
        if is_identifier(head) && !is_reserved(head) && !next_is_equ {
            return Ok((Some(head.to_string()), tail));
        }
    }

    Ok((None, code))
}

fn parse_statement(text: &str) -> Result<Statement, ErrorKind> {
    let (first, rest) = match text.split_once(char::is_whitespace) {
        Some((first, rest)) => (first, rest.trim()),
        None => (text, ""),
    };

    if first.eq_ignore_ascii_case("ORG") || first.eq_ignore_ascii_case(".ORG") {
        if rest.is_empty() {
            return Err(ErrorKind::Syntax("ORG requires an address".to_string()));
        }
        return Ok(Statement::Org(rest.to_string()));
    }

    if first.eq_ignore_ascii_case("EQU") {
        return Err(ErrorKind::Syntax("EQU requires a name: NAME EQU value".to_string()));
    }

    let (second, value) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
    if second.eq_ignore_ascii_case("EQU") {
        let value = value.trim();
        if !is_identifier(first) {
            return Err(ErrorKind::Syntax(format!("invalid EQU name '{}'", first)));
        }
        if value.is_empty() {
            return Err(ErrorKind::Syntax(format!("EQU '{}' has no value", first)));
        }
        return Ok(Statement::Equ { name: first.to_string(), value: value.to_string() });
    }

    Ok(Statement::Instruction(text.to_string()))
}

/// Parse one source line. `None` for blank and comment-only lines.
pub fn parse_line(raw: &str) -> Result<Option<Line>, ErrorKind> {
    let code = strip_comment(raw);
    if code.trim().is_empty() {
        return Ok(None);
    }

    let (label, rest) = split_label(code.trim_end())?;
    let rest = rest.trim();
    let statement = if rest.is_empty() { None } else { Some(parse_statement(rest)?) };
    Ok(Some(Line { label, statement }))
}
