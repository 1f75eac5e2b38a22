// Property File Parser
// Parses `key = value` configuration files

/// Parse property-file text, invoking `handler` for each key-value pair.
///
/// Blank lines and lines starting with `#` are skipped, a `#` after a value
/// starts an inline comment, and whitespace around keys and values is
/// trimmed. Lines without `=` are logged and skipped. Key case is preserved.
/// The 1-based line number is passed along so callers can report errors.
pub fn parse_propfile(data: &str, handler: &mut dyn FnMut(usize, &str, &str)) {
    for (idx, raw) in data.lines().enumerate() {
        let line = match raw.find('#') {
            Some(pos) => &raw[..pos],
            None => raw,
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            log::warn!("line {}: key without value", idx + 1);
            continue;
        };

        let key = key.trim();
        if key.is_empty() {
            log::warn!("line {}: value without key", idx + 1);
            continue;
        }

        handler(idx + 1, key, value.trim());
    }
}
