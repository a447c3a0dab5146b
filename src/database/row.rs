use serde::Serialize;
use std::fmt;

/// A single column value as read back from the storage collaborator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ColumnValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl ColumnValue {
    pub fn is_null(&self) -> bool {
        matches!(self, ColumnValue::Null)
    }

    /// Integers and booleans as `i64`; numeric text is parsed.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ColumnValue::Integer(value) => Some(*value),
            ColumnValue::Bool(value) => Some(i64::from(*value)),
            ColumnValue::Text(value) => value.trim().parse().ok(),
            ColumnValue::Null | ColumnValue::Float(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ColumnValue::Text(value) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for ColumnValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnValue::Null => Ok(()),
            ColumnValue::Bool(value) => write!(f, "{value}"),
            ColumnValue::Integer(value) => write!(f, "{value}"),
            ColumnValue::Float(value) => write!(f, "{value}"),
            ColumnValue::Text(value) => f.write_str(value),
        }
    }
}

/// One fetched row: column names and values in select order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultRow {
    columns: Vec<(String, ColumnValue)>,
}

impl ResultRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: ColumnValue) {
        self.columns.push((name.into(), value));
    }

    /// First column called `name`
    pub fn get(&self, name: &str) -> Option<&ColumnValue> {
        self.columns
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, value)| value)
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(ColumnValue::as_i64)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(ColumnValue::as_str)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ColumnValue)> {
        self.columns.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_access() {
        let mut row = ResultRow::new();
        row.push("id", ColumnValue::Integer(7));
        row.push("name", ColumnValue::Text("seven".to_string()));
        row.push("note", ColumnValue::Null);

        assert_eq!(row.len(), 3);
        assert_eq!(row.get_i64("id"), Some(7));
        assert_eq!(row.get_str("name"), Some("seven"));
        assert!(row.get("note").unwrap().is_null());
        assert_eq!(row.get("missing"), None);
        assert_eq!(row.column_names().collect::<Vec<_>>(), vec!["id", "name", "note"]);
    }

    #[test]
    fn test_value_conversions() {
        assert_eq!(ColumnValue::Bool(true).as_i64(), Some(1));
        assert_eq!(ColumnValue::Text(" 42 ".to_string()).as_i64(), Some(42));
        assert_eq!(ColumnValue::Float(1.5).as_i64(), None);
        assert_eq!(ColumnValue::Integer(3).as_str(), None);
        assert_eq!(ColumnValue::Float(1.5).to_string(), "1.5");
        assert_eq!(ColumnValue::Null.to_string(), "");
    }
}
