use std::fmt::Write as _;

use serde_json::Value as JsonValue;

use super::{
    FieldValue, IntoQuery, Params, Query, QueryKind, check_field_path, check_fields, check_ident,
    collect_fields, render_assignments,
};

/// Sort direction for `ORDER BY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ordering {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
enum Source {
    Unset,
    Target(String),
    Record(String, String),
}

/// `SELECT` builder. `select(&[])` projects every field.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct Select {
    projection: Vec<String>,
    source: Source,
    conditions: Vec<(String, FieldValue)>,
    order: Vec<(String, Ordering)>,
    limit: Option<u64>,
    start: Option<u64>,
}

/// Start a `SELECT` of `fields`; an empty list selects `*`.
pub fn select<S: AsRef<str>>(fields: &[S]) -> Select {
    Select {
        projection: fields.iter().map(|f| f.as_ref().to_string()).collect(),
        source: Source::Unset,
        conditions: Vec::new(),
        order: Vec::new(),
        limit: None,
        start: None,
    }
}

/// `SELECT *`.
pub fn select_all() -> Select {
    select::<&str>(&[])
}

impl Select {
    /// Read from a table or a `$variable` bound earlier in the transaction.
    pub fn from(mut self, target: impl Into<String>) -> Self {
        self.source = Source::Target(target.into());
        self
    }

    /// Read a single record `table:id`.
    pub fn from_record(mut self, table: impl Into<String>, id: impl Into<String>) -> Self {
        self.source = Source::Record(table.into(), id.into());
        self
    }

    /// Equality conditions joined with `AND`. An empty map omits `WHERE`.
    pub fn where_eq<I, K, V>(mut self, conditions: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<FieldValue>,
    {
        self.conditions = collect_fields(conditions);
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, ordering: Ordering) -> Self {
        self.order.push((field.into(), ordering));
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn start(mut self, start: u64) -> Self {
        self.start = Some(start);
        self
    }
}

/// Validate a `FROM` target: a table identifier or a `$variable`.
pub(super) fn check_target(target: &str, problems: &mut Vec<String>) {
    match target.strip_prefix('$') {
        Some(var) => check_ident("variable name", var, problems),
        None => check_ident("table name", target, problems),
    }
}

/// Append ` WHERE a = $x AND b = $y` when there are conditions.
pub(super) fn push_where(
    template: &mut String,
    params: &mut Params,
    conditions: &[(String, FieldValue)],
    problems: &mut Vec<String>,
) {
    if conditions.is_empty() {
        return;
    }
    check_fields(conditions, problems);
    template.push_str(" WHERE ");
    template.push_str(&render_assignments(params, conditions, " AND "));
}

impl IntoQuery for Select {
    fn into_query(self) -> Query {
        let mut params = Params::default();
        let mut problems = Vec::new();

        let projection = if self.projection.is_empty() {
            "*".to_string()
        } else {
            if self.projection.iter().any(|f| f.trim().is_empty()) {
                problems.push("selected field is empty".into());
            }
            self.projection.join(", ")
        };

        let source = match &self.source {
            Source::Unset => {
                problems.push("select has no FROM target".into());
                String::new()
            }
            Source::Target(target) => {
                check_target(target, &mut problems);
                target.clone()
            }
            Source::Record(table, id) => {
                check_ident("table name", table, &mut problems);
                let tb = params.bind("tb", JsonValue::String(table.clone()));
                let id = params.bind("id", JsonValue::String(id.clone()));
                format!("type::thing({tb}, {id})")
            }
        };

        let mut template = format!("SELECT {projection} FROM {source}");
        push_where(&mut template, &mut params, &self.conditions, &mut problems);

        if !self.order.is_empty() {
            template.push_str(" ORDER BY ");
            for (i, (field, ordering)) in self.order.iter().enumerate() {
                if i > 0 {
                    template.push_str(", ");
                }
                check_field_path(field, &mut problems);
                let dir = match ordering {
                    Ordering::Asc => "ASC",
                    Ordering::Desc => "DESC",
                };
                let _ = write!(template, "{field} {dir}");
            }
        }
        if let Some(limit) = self.limit {
            let _ = write!(template, " LIMIT {limit}");
        }
        if let Some(start) = self.start {
            let _ = write!(template, " START {start}");
        }

        let (text, bindings) = params.finish(&template);
        Query::new(QueryKind::Select, text, bindings).with_problems(problems)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_projection_selects_everything() {
        let q = select_all().from("organisation").into_query();
        assert_eq!(q.text(), "SELECT * FROM organisation");
        assert!(q.bindings().is_empty());
    }

    #[test]
    fn where_compiles_to_equality_and() {
        let q = select(&["id"])
            .from("organisation")
            .where_eq([("isEnabled", FieldValue::from(true)), ("name", "Test".into())])
            .into_query();
        assert!(q.text().starts_with("SELECT id FROM organisation WHERE isEnabled = $"));
        assert!(q.text().contains(" AND name = $"));
        assert_eq!(q.bindings().len(), 2);
        assert!(q.bindings().values().any(|v| v == &json!(true)));
    }

    #[test]
    fn empty_conditions_omit_where() {
        let none: [(&str, FieldValue); 0] = [];
        let q = select(&["name"]).from("organisation").where_eq(none).into_query();
        assert_eq!(q.text(), "SELECT name FROM organisation");
    }

    #[test]
    fn variables_are_valid_targets() {
        let q = select::<&str>(&[]).from("$orgs").into_query();
        assert_eq!(q.text(), "SELECT * FROM $orgs");
        assert!(q.check().is_ok());
    }

    #[test]
    fn ordering_limit_and_start_are_rendered_in_order() {
        let q = select(&["name"])
            .from("organisation")
            .order_by("name", Ordering::Desc)
            .limit(10)
            .start(20)
            .into_query();
        assert_eq!(
            q.text(),
            "SELECT name FROM organisation ORDER BY name DESC LIMIT 10 START 20"
        );
    }

    #[test]
    fn order_fields_are_checked() {
        let ok = select_all()
            .from("organisation")
            .order_by("address.city", Ordering::Asc)
            .into_query();
        assert!(ok.check().is_ok());

        let bad = select_all()
            .from("organisation")
            .order_by("name; DELETE organisation", Ordering::Asc)
            .into_query();
        let err = bad.check().unwrap_err().to_string();
        assert!(err.contains("not a valid field path"));
    }

    #[test]
    fn missing_target_is_a_usage_problem() {
        let q = select(&["name"]).into_query();
        assert!(q.check().is_err());
        let q = select(&["name"]).from("").into_query();
        assert!(q.check().is_err());
    }
}
