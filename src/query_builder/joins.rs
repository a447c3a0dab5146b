use super::conditions::Condition;
use serde::{Deserialize, Serialize};

/// Represents the SQL JOIN kinds a list query may use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinType {
    Inner,
    Left,
    Right,
}

impl JoinType {
    pub fn to_sql(&self) -> &'static str {
        match self {
            JoinType::Inner => "INNER JOIN",
            JoinType::Left => "LEFT JOIN",
            JoinType::Right => "RIGHT JOIN",
        }
    }
}

/// A SQL JOIN clause plus an optional condition that belongs to the joined
/// table but is applied in the WHERE clause rather than in ON.
///
/// `table` and `on_condition` are caller-trusted fragments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinSpec {
    pub join_type: JoinType,
    pub table: String,
    pub on_condition: String,
    pub extra_condition: Option<Condition>,
}

impl JoinSpec {
    pub fn new(join_type: JoinType, table: &str, on_condition: &str) -> Self {
        Self {
            join_type,
            table: table.to_string(),
            on_condition: on_condition.to_string(),
            extra_condition: None,
        }
    }

    /// Create an INNER JOIN
    pub fn inner(table: &str, on_condition: &str) -> Self {
        Self::new(JoinType::Inner, table, on_condition)
    }

    /// Create a LEFT JOIN
    pub fn left(table: &str, on_condition: &str) -> Self {
        Self::new(JoinType::Left, table, on_condition)
    }

    /// Create a RIGHT JOIN
    pub fn right(table: &str, on_condition: &str) -> Self {
        Self::new(JoinType::Right, table, on_condition)
    }

    pub fn with_extra_condition(mut self, condition: Condition) -> Self {
        self.extra_condition = Some(condition);
        self
    }

    /// Convert to SQL string
    pub fn to_sql(&self) -> String {
        format!(
            "{} {} ON {}",
            self.join_type.to_sql(),
            self.table,
            self.on_condition
        )
    }
}

/// Rendered JOIN clauses and the WHERE fragment collected from their extra conditions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedJoins {
    pub join_sql: String,
    pub extra_condition_sql: String,
}

/// Ordered collection of joins; rendering keeps insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JoinRegistry {
    joins: Vec<JoinSpec>,
}

impl JoinRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_join(&mut self, join: JoinSpec) {
        self.joins.push(join);
    }

    pub fn joins(&self) -> &[JoinSpec] {
        &self.joins
    }

    pub fn is_empty(&self) -> bool {
        self.joins.is_empty()
    }

    pub fn replace(&mut self, joins: Vec<JoinSpec>) {
        self.joins = joins;
    }

    pub fn render(&self) -> RenderedJoins {
        let join_sql = self
            .joins
            .iter()
            .map(JoinSpec::to_sql)
            .collect::<Vec<_>>()
            .join(" ");

        let extra_condition_sql = self
            .joins
            .iter()
            .filter_map(|join| join.extra_condition.as_ref())
            .map(Condition::to_sql)
            .filter(|sql| !sql.trim().is_empty())
            .map(|sql| format!("({sql})"))
            .collect::<Vec<_>>()
            .join(" AND ");

        RenderedJoins {
            join_sql,
            extra_condition_sql,
        }
    }
}
