use super::keywords::KeywordSet;
use crate::error::{DbQueryError, Result};
use serde::{Deserialize, Serialize};

/// Comparison operators accepted by [`Condition::simple`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Eq,
    NotEq,
    Lt,
    Lte,
    Gt,
    Gte,
    Like,
    NotLike,
}

impl Operator {
    pub fn to_sql(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::NotEq => "<>",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Like => "LIKE",
            Operator::NotLike => "NOT LIKE",
        }
    }
}

/// A single predicate fragment.
///
/// Every variant except [`Condition::Raw`] is built from a validated column
/// identifier and escaped literal values, so it cannot smuggle SQL in through
/// a value. `Raw` is for caller-trusted fragments only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Condition {
    Simple {
        field: String,
        operator: Operator,
        value: serde_json::Value,
    },
    In {
        field: String,
        values: Vec<serde_json::Value>,
    },
    NotIn {
        field: String,
        values: Vec<serde_json::Value>,
    },
    Between {
        field: String,
        start: serde_json::Value,
        end: serde_json::Value,
    },
    IsNull {
        field: String,
    },
    IsNotNull {
        field: String,
    },
    /// Disjunction of nested conditions
    Any {
        conditions: Vec<Condition>,
    },
    Raw {
        sql: String,
    },
}

impl Condition {
    pub fn simple(
        field: &str,
        operator: Operator,
        value: impl Into<serde_json::Value>,
    ) -> Result<Self> {
        Ok(Condition::Simple {
            field: validate_identifier(field)?,
            operator,
            value: value.into(),
        })
    }

    pub fn eq(field: &str, value: impl Into<serde_json::Value>) -> Result<Self> {
        Self::simple(field, Operator::Eq, value)
    }

    pub fn in_list<V: Into<serde_json::Value>>(
        field: &str,
        values: impl IntoIterator<Item = V>,
    ) -> Result<Self> {
        Ok(Condition::In {
            field: validate_identifier(field)?,
            values: values.into_iter().map(Into::into).collect(),
        })
    }

    pub fn not_in<V: Into<serde_json::Value>>(
        field: &str,
        values: impl IntoIterator<Item = V>,
    ) -> Result<Self> {
        Ok(Condition::NotIn {
            field: validate_identifier(field)?,
            values: values.into_iter().map(Into::into).collect(),
        })
    }

    pub fn between(
        field: &str,
        start: impl Into<serde_json::Value>,
        end: impl Into<serde_json::Value>,
    ) -> Result<Self> {
        Ok(Condition::Between {
            field: validate_identifier(field)?,
            start: start.into(),
            end: end.into(),
        })
    }

    pub fn is_null(field: &str) -> Result<Self> {
        Ok(Condition::IsNull {
            field: validate_identifier(field)?,
        })
    }

    pub fn is_not_null(field: &str) -> Result<Self> {
        Ok(Condition::IsNotNull {
            field: validate_identifier(field)?,
        })
    }

    pub fn any(conditions: Vec<Condition>) -> Self {
        Condition::Any { conditions }
    }

    /// Caller-trusted SQL, rendered verbatim.
    pub fn raw(sql: &str) -> Self {
        Condition::Raw {
            sql: sql.to_string(),
        }
    }

    /// Convert condition to SQL string
    pub fn to_sql(&self) -> String {
        match self {
            Condition::Simple {
                field,
                operator,
                value,
            } => {
                if value.is_null() {
                    match operator {
                        Operator::Eq => return format!("{field} IS NULL"),
                        Operator::NotEq => return format!("{field} IS NOT NULL"),
                        _ => {}
                    }
                }
                format!("{} {} {}", field, operator.to_sql(), format_value(value))
            }
            Condition::In { field, values } => {
                if values.is_empty() {
                    return "1 = 0".to_string();
                }
                let value_list = values
                    .iter()
                    .map(format_value)
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{field} IN ({value_list})")
            }
            Condition::NotIn { field, values } => {
                if values.is_empty() {
                    return "1 = 1".to_string();
                }
                let value_list = values
                    .iter()
                    .map(format_value)
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{field} NOT IN ({value_list})")
            }
            Condition::Between { field, start, end } => {
                format!(
                    "{} BETWEEN {} AND {}",
                    field,
                    format_value(start),
                    format_value(end)
                )
            }
            Condition::IsNull { field } => format!("{field} IS NULL"),
            Condition::IsNotNull { field } => format!("{field} IS NOT NULL"),
            Condition::Any { conditions } => {
                if conditions.is_empty() {
                    return "1 = 0".to_string();
                }
                conditions
                    .iter()
                    .map(|c| format!("({})", c.to_sql()))
                    .collect::<Vec<_>>()
                    .join(" OR ")
            }
            Condition::Raw { sql } => sql.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// One ORDER BY term over a validated column identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: String,
    pub direction: SortDirection,
}

impl OrderBy {
    pub fn asc(field: &str) -> Result<Self> {
        Ok(Self {
            field: validate_identifier(field)?,
            direction: SortDirection::Asc,
        })
    }

    pub fn desc(field: &str) -> Result<Self> {
        Ok(Self {
            field: validate_identifier(field)?,
            direction: SortDirection::Desc,
        })
    }

    pub fn to_sql(&self) -> String {
        match self.direction {
            SortDirection::Asc => format!("{} ASC", self.field),
            SortDirection::Desc => format!("{} DESC", self.field),
        }
    }
}

/// Search state of one query: predicates, sort order and keyword ids.
///
/// All three are cleared together by [`ConditionBuilder::reset`]; joins,
/// paging and character configuration live elsewhere and survive a reset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConditionBuilder {
    conditions: Vec<Condition>,
    sorting: Vec<OrderBy>,
    keywords: KeywordSet,
}

impl ConditionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_condition(&mut self, condition: Condition) {
        self.conditions.push(condition);
    }

    pub fn add_sort(&mut self, order: OrderBy) {
        self.sorting.push(order);
    }

    pub fn set_keywords(&mut self, keywords: impl Into<KeywordSet>) {
        self.keywords = keywords.into();
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn sorting(&self) -> &[OrderBy] {
        &self.sorting
    }

    pub fn keywords(&self) -> &KeywordSet {
        &self.keywords
    }

    pub fn has_sorting(&self) -> bool {
        !self.sorting.is_empty()
    }

    /// Each condition parenthesized and joined with AND; empty when there are none.
    pub fn render_where(&self) -> String {
        self.conditions
            .iter()
            .map(|condition| format!("({})", condition.to_sql()))
            .collect::<Vec<_>>()
            .join(" AND ")
    }

    pub fn render_order_by(&self) -> String {
        self.sorting
            .iter()
            .map(OrderBy::to_sql)
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn reset(&mut self) {
        self.conditions.clear();
        self.sorting.clear();
        self.keywords = KeywordSet::default();
    }

    /// Replace the whole search state, as done when restoring stored state.
    pub fn replace(
        &mut self,
        conditions: Vec<Condition>,
        sorting: Vec<OrderBy>,
        keywords: KeywordSet,
    ) {
        self.conditions = conditions;
        self.sorting = sorting;
        self.keywords = keywords;
    }
}

/// Accept `name` or `table.name` made of ASCII letters, digits and underscores.
pub fn validate_identifier(identifier: &str) -> Result<String> {
    let valid = !identifier.is_empty()
        && identifier.split('.').count() <= 2
        && identifier.split('.').all(|part| {
            let mut chars = part.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        });

    if valid {
        Ok(identifier.to_string())
    } else {
        Err(DbQueryError::Validation(format!(
            "invalid SQL identifier: {identifier:?}"
        )))
    }
}

/// Format a JSON value as a SQL literal
pub(crate) fn format_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => "NULL".to_string(),
        serde_json::Value::Bool(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => format!("'{}'", s.replace('\'', "''")),
        _ => format!("'{}'", value.to_string().replace('\'', "''")),
    }
}
