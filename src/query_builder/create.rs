use serde::Serialize;
use serde_json::Value as JsonValue;

use super::{
    FieldValue, IntoQuery, Params, Query, QueryKind, check_fields, check_ident, collect_fields,
    render_assignments,
};

#[derive(Debug, Clone, PartialEq)]
enum Target {
    Table(String),
    Record(String, String),
}

#[derive(Debug, Clone, PartialEq)]
enum Data {
    Fields(Vec<(String, FieldValue)>),
    Content(Result<JsonValue, String>),
}

/// `CREATE` builder.
///
/// ```rust
/// use surql_middleware::prelude::*;
/// use serde_json::json;
///
/// let q = create("organisation")
///     .set_all([("name", FieldValue::from("Test")), ("createdAt", time_now().into())])
///     .into_query();
/// assert!(q.text().starts_with("CREATE organisation SET name = $"));
/// assert!(q.bindings().values().any(|v| v == &json!("Test")));
/// ```
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct Create {
    target: Target,
    data: Data,
}

/// Create a record with a generated id in `table`.
pub fn create(table: impl Into<String>) -> Create {
    Create {
        target: Target::Table(table.into()),
        data: Data::Fields(Vec::new()),
    }
}

/// Create the record `table:id`. The descriptor expects a single row.
pub fn create_record(table: impl Into<String>, id: impl Into<String>) -> Create {
    Create {
        target: Target::Record(table.into(), id.into()),
        data: Data::Fields(Vec::new()),
    }
}

impl Create {
    /// Assign one field, keeping previously assigned ones.
    pub fn set(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        let entry = (field.into(), value.into());
        if let Data::Fields(fields) = &mut self.data {
            fields.retain(|(name, _)| *name != entry.0);
            fields.push(entry);
        } else {
            self.data = Data::Fields(vec![entry]);
        }
        self
    }

    /// Replace the assigned fields with `fields`.
    pub fn set_all<I, K, V>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<FieldValue>,
    {
        self.data = Data::Fields(collect_fields(fields));
        self
    }

    /// Use a serializable value as the full record content (`CONTENT $value`).
    pub fn content(mut self, value: impl Serialize) -> Self {
        self.data = Data::Content(serde_json::to_value(value).map_err(|e| e.to_string()));
        self
    }
}

impl IntoQuery for Create {
    fn into_query(self) -> Query {
        let mut params = Params::default();
        let mut problems = Vec::new();

        let (target, single) = match &self.target {
            Target::Table(table) => {
                check_ident("table name", table, &mut problems);
                (table.clone(), false)
            }
            Target::Record(table, id) => {
                check_ident("table name", table, &mut problems);
                if id.is_empty() {
                    problems.push("record id is empty".into());
                }
                let tb = params.bind("tb", JsonValue::String(table.clone()));
                let id = params.bind("id", JsonValue::String(id.clone()));
                (format!("type::thing({tb}, {id})"), true)
            }
        };

        let mut template = format!("CREATE {target}");
        match &self.data {
            Data::Fields(fields) if fields.is_empty() => {}
            Data::Fields(fields) => {
                check_fields(fields, &mut problems);
                template.push_str(" SET ");
                template.push_str(&render_assignments(&mut params, fields, ", "));
            }
            Data::Content(Ok(value)) if value.is_object() => {
                let content = params.bind("content", value.clone());
                template.push_str(" CONTENT ");
                template.push_str(&content);
            }
            Data::Content(Ok(_)) => problems.push("record content must be an object".into()),
            Data::Content(Err(e)) => problems.push(format!("record content: {e}")),
        }

        let (text, bindings) = params.finish(&template);
        Query::new(QueryKind::Create, text, bindings)
            .with_single(single)
            .with_problems(problems)
    }
}
