use crate::error::{DbQueryError, Result};
use crate::query_builder::conditions::validate_identifier;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Persistence partition for stored search state.
///
/// A session has at most one `Toplevel` state per qualifier (latest wins);
/// `Sublevel` states are keyed by name and coexist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreScope {
    Toplevel,
    Sublevel,
}

impl StoreScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreScope::Toplevel => "toplevel",
            StoreScope::Sublevel => "sublevel",
        }
    }

    pub fn is_toplevel(&self) -> bool {
        matches!(self, StoreScope::Toplevel)
    }
}

impl AsRef<str> for StoreScope {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for StoreScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StoreScope {
    type Err = DbQueryError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "toplevel" => Ok(StoreScope::Toplevel),
            "sublevel" => Ok(StoreScope::Sublevel),
            other => Err(DbQueryError::validation(format!(
                "Invalid store level '{other}', expected 'toplevel' or 'sublevel'"
            ))),
        }
    }
}

/// Extra caller-supplied key parts, e.g. a tenant id, that partition stored
/// state on top of the session id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeQualifier {
    pairs: Vec<(String, String)>,
}

impl ScopeQualifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a `column = value` pair; the column must be a plain identifier.
    pub fn with(mut self, column: &str, value: impl ToString) -> Result<Self> {
        let column = validate_identifier(column)?;
        self.pairs.push((column, value.to_string()));
        Ok(self)
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Stable rendering used as the stored `qualifier` column, `""` when empty.
    ///
    /// Separators inside values are backslash-escaped, so distinct pair lists
    /// never render the same.
    pub fn canonical(&self) -> String {
        self.pairs
            .iter()
            .map(|(column, value)| format!("{column}={}", escape_value(value)))
            .collect::<Vec<_>>()
            .join(",")
    }
}

fn escape_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | ',' | '=') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Storage key of one stored state row.
///
/// The unique part is `(session_id, qualifier, toplevel, slot)`; `slot` is
/// empty for toplevel states so a new toplevel save replaces the old one
/// whatever its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreKey {
    session_id: String,
    qualifier: String,
    scope: StoreScope,
    name: String,
}

impl StoreKey {
    pub fn new(
        session_id: &str,
        qualifier: &ScopeQualifier,
        scope: StoreScope,
        name: &str,
    ) -> Self {
        Self {
            session_id: session_id.to_string(),
            qualifier: qualifier.canonical(),
            scope,
            name: name.to_string(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn qualifier(&self) -> &str {
        &self.qualifier
    }

    pub fn scope(&self) -> StoreScope {
        self.scope
    }

    pub fn toplevel(&self) -> bool {
        self.scope.is_toplevel()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn slot(&self) -> &str {
        match self.scope {
            StoreScope::Toplevel => "",
            StoreScope::Sublevel => &self.name,
        }
    }
}
