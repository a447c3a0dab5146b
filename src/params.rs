//! Externally supplied request parameters.
//!
//! The engine only ever reads three caller-named values from here: the paging
//! offset, the current letter, and whether stored state should be restored.

use crate::query_builder::MAX_OFFSET;
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestParams {
    values: HashMap<String, String>,
}

impl RequestParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        if key.is_empty() {
            return None;
        }
        self.values.get(key).map(String::as_str)
    }

    /// Non-empty value for `key`, if any.
    pub fn get_non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|value| !value.is_empty())
    }

    /// Parse an offset the way a query string offset is read: leading digits
    /// only, anything unparsable counts as zero, anything too large is
    /// clamped to [`MAX_OFFSET`].
    pub fn get_offset(&self, key: &str) -> Option<u64> {
        let raw = self.get(key)?;
        let digits: String = raw.trim().chars().take_while(char::is_ascii_digit).collect();
        match digits.parse::<u64>() {
            Ok(offset) => Some(offset.min(MAX_OFFSET)),
            Err(_) if !digits.is_empty() => {
                tracing::warn!(
                    parameter = %key,
                    value = %raw,
                    "Paging offset out of range, clamped"
                );
                Some(MAX_OFFSET)
            }
            Err(_) => {
                tracing::warn!(parameter = %key, value = %raw, "Unparsable paging offset, using 0");
                Some(0)
            }
        }
    }
}

impl<K, V> FromIterator<(K, V)> for RequestParams
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
