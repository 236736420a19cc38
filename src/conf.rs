//! Parser for predefined signal-list configuration files.
//!
//! A `.conf` file is plain UTF-8 text, one signal path per line. Paths are
//! tokenized on `;` by default; a line containing `/` is tokenized on `/`
//! instead and lands in the secondary group list (alternate grouping used
//! for insight-only selections). `#` starts a comment line; blank lines
//! are skipped; empty tokens from repeated delimiters are dropped.

use std::path::Path;

/// Recognized configuration file extension
pub const CONF_EXTENSION: &str = "conf";

/// Primary token delimiter
pub const PRIMARY_DELIMITER: char = ';';

/// Secondary token delimiter (alternate grouping)
pub const SECONDARY_DELIMITER: char = '/';

/// Comment line marker
const COMMENT_MARKER: char = '#';

/// Parse a configuration file into primary and secondary token groups.
///
/// A path without the `.conf` extension, or one that cannot be read, yields
/// two empty lists; both are expected user conditions, not errors.
pub fn parse(path: &Path) -> (Vec<Vec<String>>, Vec<Vec<String>>) {
    let mut primary_groups = Vec::new();
    let mut secondary_groups = Vec::new();

    if path.extension().and_then(|e| e.to_str()) != Some(CONF_EXTENSION) {
        tracing::debug!(path = %path.display(), "not a configuration file, skipping");
        return (primary_groups, secondary_groups);
    }

    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to read configuration file");
            return (primary_groups, secondary_groups);
        }
    };

    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with(COMMENT_MARKER) {
            continue;
        }

        let (delimiter, groups) = if line.contains(SECONDARY_DELIMITER) {
            (SECONDARY_DELIMITER, &mut secondary_groups)
        } else {
            (PRIMARY_DELIMITER, &mut primary_groups)
        };

        let tokens: Vec<String> = line
            .split(delimiter)
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::to_string)
            .collect();

        if !tokens.is_empty() {
            groups.push(tokens);
        }
    }

    (primary_groups, secondary_groups)
}
