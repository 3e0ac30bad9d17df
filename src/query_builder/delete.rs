use serde_json::Value as JsonValue;

use super::{Params, Query, QueryKind, check_ident};
use crate::types::RecordRelation;

/// Delete the record `table:id`.
#[must_use]
pub fn del_record(table: impl Into<String>, id: impl Into<String>) -> Query {
    let (table, id) = (table.into(), id.into());
    let mut params = Params::default();
    let mut problems = Vec::new();
    check_ident("table name", &table, &mut problems);
    if id.is_empty() {
        problems.push("record id is empty".into());
    }

    let tb = params.bind("tb", JsonValue::String(table));
    let id = params.bind("id", JsonValue::String(id));
    let (text, bindings) = params.finish(&format!("DELETE type::thing({tb}, {id})"));
    Query::new(QueryKind::Delete, text, bindings).with_problems(problems)
}

/// Delete every `edge` row joining the two records of `relation`.
#[must_use]
pub fn del_relation(relation: &RecordRelation) -> Query {
    let mut params = Params::default();
    let mut problems = Vec::new();
    check_relation(relation, &mut problems);

    let (from, to) = bind_endpoints(&mut params, relation);
    let template = format!("DELETE {} WHERE in = {from} AND out = {to}", relation.edge);
    let (text, bindings) = params.finish(&template);
    Query::new(QueryKind::Delete, text, bindings).with_problems(problems)
}

pub(super) fn check_relation(relation: &RecordRelation, problems: &mut Vec<String>) {
    check_ident("from table", &relation.from_table, problems);
    check_ident("edge name", &relation.edge, problems);
    check_ident("to table", &relation.to_table, problems);
    if relation.from_id.is_empty() || relation.to_id.is_empty() {
        problems.push("relation record id is empty".into());
    }
}

/// Bind both endpoints and return their `type::thing(...)` expressions.
pub(super) fn bind_endpoints(params: &mut Params, relation: &RecordRelation) -> (String, String) {
    let from_tb = params.bind("from_tb", JsonValue::String(relation.from_table.clone()));
    let from_id = params.bind("from_id", JsonValue::String(relation.from_id.clone()));
    let to_tb = params.bind("to_tb", JsonValue::String(relation.to_table.clone()));
    let to_id = params.bind("to_id", JsonValue::String(relation.to_id.clone()));
    (
        format!("type::thing({from_tb}, {from_id})"),
        format!("type::thing({to_tb}, {to_id})"),
    )
}
