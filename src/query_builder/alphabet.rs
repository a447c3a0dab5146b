//! Letter navigation ("jump to letter") over the first character of a field.

use super::builder::QuerySource;
use super::conditions::{format_value, validate_identifier};
use super::Dialect;
use crate::error::Result;
use serde::Serialize;
use std::collections::BTreeSet;

/// Column alias used by the letter enumeration statement
pub const LETTER_ALIAS: &str = "letter";

/// Character navigation settings and the letter resolved for this request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CharacterState {
    trigger_name: String,
    source_field: Option<String>,
    enabled: bool,
    resolved_letter: Option<String>,
    dropped: bool,
}

impl CharacterState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name the trigger parameter and the field letters are taken from.
    /// Ignored when either is empty.
    pub fn define(&mut self, trigger_name: &str, source_field: &str) -> Result<()> {
        if trigger_name.is_empty() || source_field.is_empty() {
            return Ok(());
        }
        self.source_field = Some(validate_identifier(source_field)?);
        self.trigger_name = trigger_name.to_string();
        Ok(())
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_defined(&self) -> bool {
        self.source_field.is_some()
    }

    pub fn trigger_name(&self) -> &str {
        &self.trigger_name
    }

    pub fn source_field(&self) -> Option<&str> {
        self.source_field.as_deref()
    }

    pub fn resolved_letter(&self) -> Option<&str> {
        self.resolved_letter.as_deref()
    }

    pub fn set_resolved_letter(&mut self, letter: Option<String>) {
        self.resolved_letter = letter.filter(|l| !l.is_empty());
    }

    /// Turn letter filtering off for the rest of this request; the resolved
    /// letter is kept so it can still be persisted.
    pub fn drop_for_request(&mut self) {
        self.enabled = false;
        self.dropped = true;
    }

    pub fn was_dropped(&self) -> bool {
        self.dropped
    }

    /// Letters can be offered when a field is defined and filtering was not
    /// dropped for this request
    pub fn offers_navigation(&self) -> bool {
        self.is_defined() && !self.dropped
    }
}

/// Where the letter for this request comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LetterResolution {
    FromTrigger(String),
    FromStore(String),
    /// Take the first letter of the alphabet index
    FirstAvailable,
}

/// Lowercased first character of `value`, if it has one.
fn leading_letter(value: &str) -> Option<String> {
    value.chars().next().map(|c| c.to_lowercase().collect())
}

/// Trigger value first, then a stored letter, then the index.
///
/// Only the first character of either value is used.
pub fn resolve_letter(
    trigger_value: Option<&str>,
    stored_letter: Option<&str>,
) -> LetterResolution {
    if let Some(letter) = trigger_value.and_then(leading_letter) {
        return LetterResolution::FromTrigger(letter);
    }
    if let Some(letter) = stored_letter.and_then(leading_letter) {
        return LetterResolution::FromStore(letter);
    }
    LetterResolution::FirstAvailable
}

/// Statement listing the distinct first characters of `source_field` over
/// the unpaged, un-lettered row set described by `source`.
pub fn letter_query(source: &QuerySource<'_>, dialect: Dialect, source_field: &str) -> String {
    source
        .builder()
        .build_distinct_sql(&dialect.first_char(source_field), LETTER_ALIAS)
}

/// Lowercased, deduplicated, code-point ordered letters.
///
/// Null and blank values are skipped. Fewer than two distinct letters make
/// the index pointless, so the result is empty.
pub fn collect_letters<I>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = Option<String>>,
{
    let letters: BTreeSet<String> = values
        .into_iter()
        .flatten()
        .filter(|value| !value.trim().is_empty())
        .map(|value| value.to_lowercase())
        .collect();

    if letters.len() <= 1 {
        return Vec::new();
    }
    letters.into_iter().collect()
}

/// WHERE fragment restricting `source_field` to rows starting with `letter`
pub fn letter_condition(dialect: Dialect, source_field: &str, letter: &str) -> String {
    format!(
        "({} = {})",
        dialect.lower(&dialect.first_char(source_field)),
        format_value(&serde_json::Value::String(letter.to_lowercase()))
    )
}
