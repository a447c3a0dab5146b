//! Keyword (tag) filtering with ALL-of semantics.
//!
//! A non-empty keyword set joins the association table, keeps only the
//! association rows for the wanted keywords, groups by the entity id and
//! requires the number of matched keywords to equal the size of the set.

use crate::config::DbQueryConfig;
use serde::{Deserialize, Serialize};

/// Ordered set of keyword ids; duplicates are dropped on insert.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeywordSet {
    ids: Vec<i64>,
}

impl KeywordSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: i64) -> bool {
        if self.ids.contains(&id) {
            return false;
        }
        self.ids.push(id);
        true
    }

    pub fn ids(&self) -> &[i64] {
        &self.ids
    }

    /// Id at `index`, or 0 when there is none.
    pub fn get(&self, index: usize) -> i64 {
        self.ids.get(index).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl From<i64> for KeywordSet {
    fn from(id: i64) -> Self {
        Self { ids: vec![id] }
    }
}

impl FromIterator<i64> for KeywordSet {
    fn from_iter<I: IntoIterator<Item = i64>>(iter: I) -> Self {
        let mut set = KeywordSet::new();
        for id in iter {
            set.insert(id);
        }
        set
    }
}

impl From<Vec<i64>> for KeywordSet {
    fn from(ids: Vec<i64>) -> Self {
        ids.into_iter().collect()
    }
}

impl From<&[i64]> for KeywordSet {
    fn from(ids: &[i64]) -> Self {
        ids.iter().copied().collect()
    }
}

impl<const N: usize> From<[i64; N]> for KeywordSet {
    fn from(ids: [i64; N]) -> Self {
        ids.into_iter().collect()
    }
}

/// Where the keyword associations live
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordAssociation {
    pub table: String,
    pub foreign_key: String,
    pub key_column: String,
}

impl Default for KeywordAssociation {
    fn default() -> Self {
        Self::from_config(&DbQueryConfig::default())
    }
}

impl KeywordAssociation {
    pub fn from_config(config: &DbQueryConfig) -> Self {
        Self {
            table: config.keyword_table.clone(),
            foreign_key: config.keyword_foreign_key.clone(),
            key_column: config.keyword_key_column.clone(),
        }
    }

    fn qualified_key(&self) -> String {
        format!("{}.{}", self.table, self.key_column)
    }
}

/// SQL fragments contributed by a keyword set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordFragments {
    pub join_sql: String,
    pub where_sql: String,
    pub group_by: String,
    pub having: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordFilter {
    association: KeywordAssociation,
}

impl KeywordFilter {
    pub fn new(association: KeywordAssociation) -> Self {
        Self { association }
    }

    pub fn association(&self) -> &KeywordAssociation {
        &self.association
    }

    /// Fragments for `keywords` against the entity id column, or `None` when
    /// the set holds no usable id.
    ///
    /// Zero ids are left out of the disjunction but still count toward the
    /// required match count.
    pub fn render(
        &self,
        keywords: &KeywordSet,
        entity_id_column: &str,
    ) -> Option<KeywordFragments> {
        let key = self.association.qualified_key();
        let disjunction = keywords
            .ids()
            .iter()
            .filter(|id| **id != 0)
            .map(|id| format!("{key} = {id}"))
            .collect::<Vec<_>>();

        if disjunction.is_empty() {
            return None;
        }

        Some(KeywordFragments {
            join_sql: format!(
                "LEFT JOIN {} ON {}.{} = {}",
                self.association.table,
                self.association.table,
                self.association.foreign_key,
                entity_id_column
            ),
            where_sql: format!("({})", disjunction.join(" OR ")),
            group_by: entity_id_column.to_string(),
            having: format!("COUNT(DISTINCT {key}) = {}", keywords.len()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_set_renders_nothing() {
        let filter = KeywordFilter::default();
        assert_eq!(filter.render(&KeywordSet::new(), "contact.id"), None);
        assert_eq!(filter.render(&KeywordSet::from(0), "contact.id"), None);
    }

    #[test]
    fn test_single_keyword() {
        let filter = KeywordFilter::default();
        let fragments = filter.render(&KeywordSet::from(1), "contact.id").unwrap();
        assert_eq!(
            fragments.join_sql,
            "LEFT JOIN keyword_x_object ON keyword_x_object.belong_to = contact.id"
        );
        assert_eq!(fragments.where_sql, "(keyword_x_object.keyword_id = 1)");
        assert_eq!(fragments.group_by, "contact.id");
        assert_eq!(
            fragments.having,
            "COUNT(DISTINCT keyword_x_object.keyword_id) = 1"
        );
    }

    #[test]
    fn test_zero_ids_skipped_but_counted() {
        let filter = KeywordFilter::default();
        let fragments = filter.render(&KeywordSet::from([4, 0, 7]), "t.id").unwrap();
        assert_eq!(
            fragments.where_sql,
            "(keyword_x_object.keyword_id = 4 OR keyword_x_object.keyword_id = 7)"
        );
        assert!(fragments.having.ends_with("= 3"));
    }

    #[test]
    fn test_custom_association() {
        let filter = KeywordFilter::new(KeywordAssociation {
            table: "tags".to_string(),
            foreign_key: "product_id".to_string(),
            key_column: "tag_id".to_string(),
        });
        let fragments = filter.render(&KeywordSet::from(vec![2, 3]), "product.id").unwrap();
        assert_eq!(fragments.join_sql, "LEFT JOIN tags ON tags.product_id = product.id");
        assert_eq!(fragments.having, "COUNT(DISTINCT tags.tag_id) = 2");
    }

    #[test]
    fn test_keyword_set_dedup_and_index() {
        let set: KeywordSet = vec![5, 5, 9].into();
        assert_eq!(set.ids(), &[5, 9]);
        assert_eq!(set.get(1), 9);
        assert_eq!(set.get(7), 0);
    }
}
