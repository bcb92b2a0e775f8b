//! Lexical scanning of SQL command text for parameter placeholders.
//!
//! The scanner walks the text character by character so that placeholder
//! markers inside string literals, quoted identifiers, or bracketed
//! identifiers are never mistaken for parameters. A plain substring search
//! breaks as soon as literal text happens to contain the parameter prefix.

/// A parameter occurrence found in command text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterOccurrence {
    /// Byte offset of the prefix character.
    pub start: usize,
    /// Byte offset one past the last character of the name.
    pub end: usize,
    /// The full token including its prefix, e.g. `@p0` or `:name`.
    pub name: String,
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Whether the token is a named parameter placeholder (`@name` or `:name`).
#[must_use]
pub fn is_parameter(token: &str) -> bool {
    let mut chars = token.chars();

    matches!(chars.next(), Some('@' | ':')) && {
        let rest = chars.as_str();
        !rest.is_empty() && rest.chars().all(is_name_char)
    }
}

/// Find every named parameter occurrence in the command text, in order.
///
/// Occurrences inside `'…'`, `"…"`, `` `…` `` and `[…]` runs are skipped, as
/// are doubled prefixes such as T-SQL `@@IDENTITY` globals and PostgreSQL
/// `::type` casts.
#[must_use]
pub fn parameter_occurrences(command_text: &str) -> Vec<ParameterOccurrence> {
    let bytes = command_text.as_bytes();
    let mut occurrences = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\'' => i = skip_quoted(bytes, i, b'\'', b'\''),
            b'"' => i = skip_quoted(bytes, i, b'"', b'"'),
            b'`' => i = skip_quoted(bytes, i, b'`', b'`'),
            b'[' => i = skip_quoted(bytes, i, b'[', b']'),
            prefix @ (b'@' | b':') => {
                // A doubled prefix is a global variable or a cast, not a parameter.
                if i + 1 < bytes.len() && bytes[i + 1] == prefix {
                    i += 2;
                    while i < bytes.len() && is_name_char(bytes[i] as char) {
                        i += 1;
                    }
                    continue;
                }

                let start = i;
                let mut end = i + 1;
                while end < bytes.len() && is_name_char(bytes[end] as char) {
                    end += 1;
                }

                if end > start + 1 {
                    occurrences.push(ParameterOccurrence {
                        start,
                        end,
                        name: command_text[start..end].to_string(),
                    });
                }

                i = end;
            }
            _ => i += 1,
        }
    }

    occurrences
}

fn skip_quoted(bytes: &[u8], start: usize, open: u8, close: u8) -> usize {
    let mut i = start + 1;

    while i < bytes.len() {
        if bytes[i] == close {
            // A doubled closing character is an escape, not the end.
            if open == close && i + 1 < bytes.len() && bytes[i + 1] == close {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }

    i
}

/// The distinct named parameters in the command text, in first-appearance
/// order.
///
/// A name used more than once is reported once: the argument list for a query
/// matches distinct names, not textual occurrences.
#[must_use]
pub fn get_parameter_names(command_text: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();

    for occurrence in parameter_occurrences(command_text) {
        if !names.contains(&occurrence.name) {
            names.push(occurrence.name);
        }
    }

    names
}

/// The byte offset of the first named parameter, if any.
#[must_use]
pub fn get_first_parameter_position(command_text: &str) -> Option<usize> {
    parameter_occurrences(command_text)
        .first()
        .map(|occurrence| occurrence.start)
}

/// Count positional `?` markers outside literals and quoted identifiers.
#[must_use]
pub fn count_positional_parameters(command_text: &str) -> usize {
    let bytes = command_text.as_bytes();
    let mut count = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\'' => i = skip_quoted(bytes, i, b'\'', b'\''),
            b'"' => i = skip_quoted(bytes, i, b'"', b'"'),
            b'`' => i = skip_quoted(bytes, i, b'`', b'`'),
            b'[' => i = skip_quoted(bytes, i, b'[', b']'),
            b'?' => {
                count += 1;
                i += 1;
            }
            _ => i += 1,
        }
    }

    count
}

/// Rewrite the named parameters so the distinct names become sequential
/// `{prefix}p{index}` markers ending at `total_argument_count`.
///
/// With `n` distinct names and a running total of `t` arguments after this
/// statement, the first distinct name becomes index `t - n`, the second
/// `t - n + 1`, and so on. Every occurrence of a name is rewritten, and each
/// keeps its original prefix character. The rewrite is position-based, so a
/// name which is a prefix of another (`@p1` and `@p10`) can never corrupt it.
#[must_use]
pub fn renumber_parameters(command_text: &str, total_argument_count: usize) -> String {
    let occurrences = parameter_occurrences(command_text);

    if occurrences.is_empty() {
        return command_text.to_string();
    }

    let distinct = get_parameter_names(command_text);
    let first_index = total_argument_count - distinct.len();

    let mut rewritten = String::with_capacity(command_text.len());
    let mut cursor = 0;

    for occurrence in &occurrences {
        let position = distinct
            .iter()
            .position(|name| *name == occurrence.name)
            .unwrap_or(0);

        rewritten.push_str(&command_text[cursor..occurrence.start]);
        rewritten.push_str(&occurrence.name[..1]);
        rewritten.push('p');
        rewritten.push_str(&(first_index + position).to_string());
        cursor = occurrence.end;
    }

    rewritten.push_str(&command_text[cursor..]);
    rewritten
}
