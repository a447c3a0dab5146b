/// SQL flavour of the storage collaborator, for the few expressions that differ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Postgres,
    Sqlite,
}

impl Dialect {
    /// Expression yielding the first character of `field`
    pub fn first_char(&self, field: &str) -> String {
        match self {
            Dialect::Postgres => format!("LEFT({field}, 1)"),
            Dialect::Sqlite => format!("substr({field}, 1, 1)"),
        }
    }

    pub fn lower(&self, expression: &str) -> String {
        format!("LOWER({expression})")
    }

    /// Positional bind parameter, 1-based
    pub fn placeholder(&self, index: usize) -> String {
        match self {
            Dialect::Postgres => format!("${index}"),
            Dialect::Sqlite => format!("?{index}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_char() {
        assert_eq!(Dialect::Postgres.first_char("name"), "LEFT(name, 1)");
        assert_eq!(Dialect::Sqlite.first_char("c.name"), "substr(c.name, 1, 1)");
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(Dialect::Postgres.placeholder(3), "$3");
        assert_eq!(Dialect::Sqlite.placeholder(3), "?3");
    }
}
