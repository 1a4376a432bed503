/// Splits one line of an exported secrets file into its key and value.
///
/// Returns `None` for blank lines, `#` comments and lines without `=`.
/// Only the first `=` separates. The line is trimmed as a whole, the key and
/// value are kept exactly as they sit either side of the `=`.
pub fn parse_secret_line(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    line.split_once('=')
}
