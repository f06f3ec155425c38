//! `Key=Value;Key=Value` connection strings.

use std::collections::BTreeMap;

use super::DbError;

/// Parsed connection string with case-insensitive keys.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConnectionString {
    entries: BTreeMap<String, String>,
}

impl ConnectionString {
    /// Parse `input`. Empty segments are skipped; values may be wrapped in
    /// single or double quotes. Errors name the segment position, never its
    /// content.
    pub fn parse(input: &str) -> Result<Self, DbError> {
        let mut entries = BTreeMap::new();
        for (idx, segment) in input.split(';').enumerate() {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }
            let (key, value) = segment.split_once('=').ok_or_else(|| {
                DbError::InvalidConnectionString(format!("segment {} has no '='", idx + 1))
            })?;
            let key = normalize_key(key);
            if key.is_empty() {
                return Err(DbError::InvalidConnectionString(format!(
                    "segment {} has an empty key",
                    idx + 1
                )));
            }
            entries.insert(key, unquote(value.trim()).to_string());
        }
        Ok(Self { entries })
    }

    /// Look up the first present key among `aliases`.
    pub fn get(&self, aliases: &[&str]) -> Option<&str> {
        aliases
            .iter()
            .find_map(|alias| self.entries.get(&normalize_key(alias)))
            .map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}
