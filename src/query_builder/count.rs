use super::select::{check_target, push_where};
use super::{FieldValue, IntoQuery, Params, Query, QueryKind, collect_fields};

/// `SELECT count() ... GROUP ALL` builder.
///
/// The result is shaped into a plain integer, `0` when the table is empty.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct Count {
    table: String,
    conditions: Vec<(String, FieldValue)>,
}

/// Count the records of `table`.
pub fn count(table: impl Into<String>) -> Count {
    Count {
        table: table.into(),
        conditions: Vec::new(),
    }
}

impl Count {
    /// Only count records matching every condition.
    pub fn where_eq<I, K, V>(mut self, conditions: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<FieldValue>,
    {
        self.conditions = collect_fields(conditions);
        self
    }
}

impl IntoQuery for Count {
    fn into_query(self) -> Query {
        let mut params = Params::default();
        let mut problems = Vec::new();
        check_target(&self.table, &mut problems);

        let mut template = format!("SELECT count() FROM {}", self.table);
        push_where(&mut template, &mut params, &self.conditions, &mut problems);
        template.push_str(" GROUP ALL");

        let (text, bindings) = params.finish(&template);
        Query::new(QueryKind::Count, text, bindings)
            .with_single(true)
            .with_problems(problems)
    }
}
