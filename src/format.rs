use std::collections::BTreeMap;
use std::str::FromStr;

use crate::{Error, Result, Secrets};

/// Largest value the properties format accepts, in bytes.
pub const MAX_PROPERTIES_VALUE_LEN: usize = 1024 * 1024;

/// Output formats for a secrets map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Json,
    Dotenv,
    Properties,
}

impl FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "json" => Ok(Format::Json),
            "dotenv" => Ok(Format::Dotenv),
            "properties" => Ok(Format::Properties),
            other => Err(Error::UnknownFormat(String::from(other))),
        }
    }
}

/// Renders `secrets` in the chosen format.
pub fn render(secrets: &Secrets, format: Format) -> Result<String> {
    match format {
        Format::Json => to_json(secrets),
        Format::Dotenv => to_dotenv(secrets),
        Format::Properties => to_properties(secrets),
    }
}

/// Pretty JSON object, keys sorted.
pub fn to_json(secrets: &Secrets) -> Result<String> {
    let sorted: BTreeMap<&String, &String> = secrets.iter().collect();
    Ok(serde_json::to_string_pretty(&sorted)?)
}

/// Renders `KEY=value` lines sorted by key, quoting values a shell would
/// otherwise mangle.
pub fn to_dotenv(secrets: &Secrets) -> Result<String> {
    let sorted: BTreeMap<&String, &String> = secrets.iter().collect();
    for key in sorted.keys() {
        validate_dotenv_key(key)?;
    }

    let mut out = String::new();
    for (key, value) in sorted {
        out.push_str(key);
        out.push('=');
        out.push_str(&quote_shell_value(value));
        out.push('\n');
    }
    Ok(out)
}

/// Renders Java properties, `key = value` sorted by key. Every key and value
/// is checked before anything is written.
pub fn to_properties(secrets: &Secrets) -> Result<String> {
    let sorted: BTreeMap<&String, &String> = secrets.iter().collect();
    for (key, value) in &sorted {
        validate_properties_key(key)?;
        validate_properties_value(key, value)?;
    }

    let mut out = String::new();
    for (key, value) in sorted {
        out.push_str(&escape_properties(key, true));
        if value.is_empty() {
            out.push_str(" =\n");
        } else {
            out.push_str(" = ");
            out.push_str(&escape_properties(value, false));
            out.push('\n');
        }
    }
    Ok(out)
}

/// Keys must look like shell identifiers: `[A-Za-z_][A-Za-z0-9_]*`.
pub fn validate_dotenv_key(key: &str) -> Result<()> {
    let invalid = |reason: String| Error::InvalidKey {
        format: "dotenv",
        key: String::from(key),
        reason,
    };

    let first = key
        .chars()
        .next()
        .ok_or_else(|| invalid(String::from("key cannot be empty")))?;
    if !(first.is_ascii_alphabetic() || first == '_') {
        return Err(invalid(String::from(
            "key must start with a letter or underscore",
        )));
    }
    if let Some((pos, c)) = key
        .char_indices()
        .find(|(_, c)| !(c.is_ascii_alphanumeric() || *c == '_'))
    {
        return Err(invalid(format!(
            "invalid character '{}' at position {}",
            c, pos
        )));
    }
    Ok(())
}

/// Rejects keys a properties reader would split or misread.
pub fn validate_properties_key(key: &str) -> Result<()> {
    let reason = if key.is_empty() {
        "key cannot be empty"
    } else if key.contains(&['\n', '\r'][..]) {
        "key cannot contain newline characters"
    } else if key.contains(&['=', ':'][..]) {
        "key cannot contain '=' or ':' characters"
    } else if key.trim() != key {
        "key cannot have leading or trailing whitespace"
    } else {
        return Ok(());
    };
    Err(Error::InvalidKey {
        format: "properties",
        key: String::from(key),
        reason: String::from(reason),
    })
}

/// Values are capped at [`MAX_PROPERTIES_VALUE_LEN`] bytes.
pub fn validate_properties_value(key: &str, value: &str) -> Result<()> {
    if value.len() > MAX_PROPERTIES_VALUE_LEN {
        return Err(Error::InvalidValue {
            key: String::from(key),
            reason: String::from("value too large (exceeds 1MB limit)"),
        });
    }
    Ok(())
}

// Properties readers strip unescaped leading whitespace from values.
fn escape_properties(text: &str, is_key: bool) -> String {
    let mut escaped = String::with_capacity(text.len());
    let mut leading = true;
    for c in text.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            '\u{c}' => escaped.push_str("\\f"),
            ' ' if is_key || leading => escaped.push_str("\\ "),
            '#' | '!' if is_key && leading => {
                escaped.push('\\');
                escaped.push(c);
            }
            _ => escaped.push(c),
        }
        leading = leading && c.is_whitespace();
    }
    escaped
}

fn is_shell_safe(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '/' | ':')
}

fn quote_shell_value(value: &str) -> String {
    if value.is_empty() {
        return String::from("\"\"");
    }
    if value.chars().all(is_shell_safe) {
        return String::from(value);
    }

    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        match c {
            '\\' | '"' | '$' | '`' => {
                quoted.push('\\');
                quoted.push(c);
            }
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\t' => quoted.push_str("\\t"),
            _ => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}
