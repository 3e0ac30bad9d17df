use serde_json::Value as JsonValue;

use super::{Count, Create, IntoQuery, Params, Query, QueryKind, Select, check_ident};

/// What a `LET` binds: the result of a sub-query or a literal value.
#[derive(Debug, Clone, PartialEq)]
pub enum LetValue {
    Query(Query),
    Literal(JsonValue),
}

impl From<Query> for LetValue {
    fn from(value: Query) -> Self {
        Self::Query(value)
    }
}

impl From<Select> for LetValue {
    fn from(value: Select) -> Self {
        Self::Query(value.into_query())
    }
}

impl From<Create> for LetValue {
    fn from(value: Create) -> Self {
        Self::Query(value.into_query())
    }
}

impl From<Count> for LetValue {
    fn from(value: Count) -> Self {
        Self::Query(value.into_query())
    }
}

impl From<JsonValue> for LetValue {
    fn from(value: JsonValue) -> Self {
        Self::Literal(value)
    }
}

/// Bind `$name` for the statements that follow it in the same transaction.
///
/// The statement produces no row in the driver's response.
#[must_use]
pub fn let_value(name: impl Into<String>, value: impl Into<LetValue>) -> Query {
    let name = name.into();
    let name = name.strip_prefix('$').unwrap_or(&name).to_string();
    let mut problems = Vec::new();
    check_ident("variable name", &name, &mut problems);

    match value.into() {
        LetValue::Query(inner) => {
            problems.extend(inner.problems().iter().cloned());
            let text = format!("LET ${name} = ({})", inner.text());
            Query::new(QueryKind::Let, text, inner.bindings().clone()).with_problems(problems)
        }
        LetValue::Literal(literal) => {
            let mut params = Params::default();
            let placeholder = params.bind(&name, literal);
            let (text, bindings) = params.finish(&format!("LET ${name} = {placeholder}"));
            Query::new(QueryKind::Let, text, bindings).with_problems(problems)
        }
    }
}
