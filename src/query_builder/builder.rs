use super::{ConditionBuilder, Condition, JoinRegistry, KeywordFilter, Pagination};

/// SQL assembly for list queries.
///
/// Collects already-rendered fragments and produces the fetch statement, the
/// row-count statement and the distinct-value statement over the same
/// FROM/WHERE/GROUP BY/HAVING body.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    base_table: String,
    select_fields: Vec<String>,
    joins: Vec<String>,
    where_clauses: Vec<String>,
    group_by: Vec<String>,
    having: Vec<String>,
    order_by: Vec<String>,
    pagination: Option<Pagination>,
}

impl QueryBuilder {
    /// Create a new query builder for the given table
    pub fn new(table: &str) -> Self {
        Self {
            base_table: table.to_string(),
            select_fields: vec!["*".to_string()],
            joins: Vec::new(),
            where_clauses: Vec::new(),
            group_by: Vec::new(),
            having: Vec::new(),
            order_by: Vec::new(),
            pagination: None,
        }
    }

    /// Set specific fields to select
    pub fn select(mut self, fields: &[&str]) -> Self {
        if !fields.is_empty() {
            self.select_fields = fields.iter().map(|f| f.to_string()).collect();
        }
        self
    }

    /// Add rendered JOIN clauses; blank input is ignored
    pub fn join_sql(mut self, sql: &str) -> Self {
        if !sql.trim().is_empty() {
            self.joins.push(sql.to_string());
        }
        self
    }

    /// Add a WHERE fragment; fragments are ANDed, blank input is ignored
    pub fn where_sql(mut self, sql: &str) -> Self {
        if !sql.trim().is_empty() {
            self.where_clauses.push(sql.to_string());
        }
        self
    }

    pub fn group_by(mut self, field: &str) -> Self {
        self.group_by.push(field.to_string());
        self
    }

    pub fn having(mut self, sql: &str) -> Self {
        self.having.push(sql.to_string());
        self
    }

    /// Add a rendered ORDER BY list; blank input is ignored
    pub fn order_by_sql(mut self, sql: &str) -> Self {
        if !sql.trim().is_empty() {
            self.order_by.push(sql.to_string());
        }
        self
    }

    pub fn paginate(mut self, pagination: Option<Pagination>) -> Self {
        self.pagination = pagination;
        self
    }

    /// FROM, JOIN, WHERE, GROUP BY and HAVING
    fn body_sql(&self) -> String {
        let mut sql = format!("FROM {}", self.base_table);

        for join in &self.joins {
            sql.push(' ');
            sql.push_str(join);
        }

        if !self.where_clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.where_clauses.join(" AND "));
        }

        if !self.group_by.is_empty() {
            sql.push_str(&format!(" GROUP BY {}", self.group_by.join(", ")));
        }

        if !self.having.is_empty() {
            sql.push_str(" HAVING ");
            sql.push_str(&self.having.join(" AND "));
        }

        sql
    }

    /// Build the complete fetch statement
    pub fn build_sql(&self) -> String {
        let mut sql = format!("SELECT {} {}", self.select_fields.join(", "), self.body_sql());

        if !self.order_by.is_empty() {
            sql.push_str(&format!(" ORDER BY {}", self.order_by.join(", ")));
        }

        if let Some(ref pagination) = self.pagination {
            sql.push_str(&pagination.to_sql());
        }

        sql
    }

    /// Count distinct values of `id_column` over the filtered, grouped body.
    ///
    /// Wrapping in a subquery keeps a GROUP BY from turning the count into one
    /// row per group.
    pub fn build_count_sql(&self, id_column: &str) -> String {
        format!(
            "SELECT COUNT(*) AS num_rows FROM (SELECT DISTINCT {} {}) AS counted_rows",
            id_column,
            self.body_sql()
        )
    }

    /// Distinct values of `expression` over the filtered, grouped body, exposed as `alias`
    pub fn build_distinct_sql(&self, expression: &str, alias: &str) -> String {
        format!(
            "SELECT DISTINCT {alias} FROM (SELECT {expression} AS {alias} {}) AS {alias}_source",
            self.body_sql()
        )
    }
}

/// Borrowed view of everything that shapes a list query's row set.
///
/// Letter enumeration and the counting/fetching statements are all derived
/// from one of these, so they always see the same filters.
#[derive(Debug, Clone, Copy)]
pub struct QuerySource<'a> {
    pub table: &'a str,
    pub id_column: &'a str,
    pub required_condition: Option<&'a Condition>,
    pub joins: &'a JoinRegistry,
    pub search: &'a ConditionBuilder,
    pub keyword_filter: &'a KeywordFilter,
}

impl QuerySource<'_> {
    /// Builder with joins, required condition, join conditions, keyword
    /// fragments, search conditions and sorting applied.
    pub fn builder(&self) -> QueryBuilder {
        let rendered_joins = self.joins.render();
        let keywords = self
            .keyword_filter
            .render(self.search.keywords(), self.id_column);

        let mut query = QueryBuilder::new(self.table).join_sql(&rendered_joins.join_sql);

        if let Some(ref fragments) = keywords {
            query = query.join_sql(&fragments.join_sql);
        }

        if let Some(required) = self.required_condition {
            let required_sql = required.to_sql();
            if !required_sql.trim().is_empty() {
                query = query.where_sql(&format!("({required_sql})"));
            }
        }

        query = query.where_sql(&rendered_joins.extra_condition_sql);

        if let Some(ref fragments) = keywords {
            query = query.where_sql(&fragments.where_sql);
        }

        query = query.where_sql(&self.search.render_where());

        if let Some(fragments) = keywords {
            query = query.group_by(&fragments.group_by).having(&fragments.having);
        }

        query.order_by_sql(&self.search.render_order_by())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query_builder::{JoinSpec, KeywordSet, OrderBy, Operator};

    #[test]
    fn test_basic_query_building() {
        let query = QueryBuilder::new("contact")
            .select(&["contact.id", "contact.name"])
            .where_sql("(contact.id > 2)")
            .order_by_sql("contact.name ASC")
            .paginate(Some(Pagination::limit_offset(10, 20)));

        assert_eq!(
            query.build_sql(),
            "SELECT contact.id, contact.name FROM contact WHERE (contact.id > 2) \
             ORDER BY contact.name ASC LIMIT 10 OFFSET 20"
        );
    }

    #[test]
    fn test_blank_fragments_are_ignored() {
        let query = QueryBuilder::new("contact")
            .join_sql("")
            .where_sql("  ")
            .order_by_sql("");
        assert_eq!(query.build_sql(), "SELECT * FROM contact");
    }

    #[test]
    fn test_count_sql_wraps_grouped_body() {
        let query = QueryBuilder::new("t")
            .where_sql("(x = 1)")
            .group_by("t.id")
            .having("COUNT(k.id) = 2")
            .order_by_sql("t.name ASC");

        assert_eq!(
            query.build_count_sql("t.id"),
            "SELECT COUNT(*) AS num_rows FROM (SELECT DISTINCT t.id FROM t WHERE (x = 1) \
             GROUP BY t.id HAVING COUNT(k.id) = 2) AS counted_rows"
        );
    }

    #[test]
    fn test_distinct_sql() {
        let query = QueryBuilder::new("t").where_sql("(t.active = 1)");
        assert_eq!(
            query.build_distinct_sql("LEFT(t.name, 1)", "letter"),
            "SELECT DISTINCT letter FROM (SELECT LEFT(t.name, 1) AS letter FROM t \
             WHERE (t.active = 1)) AS letter_source"
        );
    }

    #[test]
    fn test_source_assembles_all_fragments_in_order() {
        let required = Condition::eq("contact.intranet_id", 1).unwrap();
        let mut joins = JoinRegistry::new();
        joins.add_join(
            JoinSpec::inner("user", "contact.user_id = user.id")
                .with_extra_condition(Condition::eq("user.active", 1).unwrap()),
        );
        let mut search = ConditionBuilder::new();
        search.add_condition(Condition::simple("contact.id", Operator::Gt, 10).unwrap());
        search.add_sort(OrderBy::asc("contact.name").unwrap());
        search.set_keywords(KeywordSet::from([3, 4]));
        let keyword_filter = KeywordFilter::default();

        let source = QuerySource {
            table: "contact",
            id_column: "contact.id",
            required_condition: Some(&required),
            joins: &joins,
            search: &search,
            keyword_filter: &keyword_filter,
        };

        assert_eq!(
            source.builder().select(&["contact.id"]).build_sql(),
            "SELECT contact.id FROM contact \
             INNER JOIN user ON contact.user_id = user.id \
             LEFT JOIN keyword_x_object ON keyword_x_object.belong_to = contact.id \
             WHERE (contact.intranet_id = 1) AND (user.active = 1) \
             AND (keyword_x_object.keyword_id = 3 OR keyword_x_object.keyword_id = 4) \
             AND (contact.id > 10) \
             GROUP BY contact.id HAVING COUNT(DISTINCT keyword_x_object.keyword_id) = 2 \
             ORDER BY contact.name ASC"
        );
    }
}
