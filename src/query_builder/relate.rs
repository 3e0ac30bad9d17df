use super::delete::{bind_endpoints, check_relation};
use super::{
    FieldValue, IntoQuery, Params, Query, QueryKind, check_fields, collect_fields,
    render_assignments,
};
use crate::types::RecordRelation;

/// `RELATE from->edge->to` builder.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct Relate {
    relation: RecordRelation,
    fields: Vec<(String, FieldValue)>,
}

/// Relate the two records of `relation` through its edge table.
pub fn relate_records(relation: &RecordRelation) -> Relate {
    Relate {
        relation: relation.clone(),
        fields: Vec::new(),
    }
}

impl Relate {
    /// Fields stored on the edge record.
    pub fn set_all<I, K, V>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<FieldValue>,
    {
        self.fields = collect_fields(fields);
        self
    }
}

impl IntoQuery for Relate {
    fn into_query(self) -> Query {
        let mut params = Params::default();
        let mut problems = Vec::new();
        check_relation(&self.relation, &mut problems);

        let (from, to) = bind_endpoints(&mut params, &self.relation);
        let mut template = format!("RELATE ({from})->{}->({to})", self.relation.edge);
        if !self.fields.is_empty() {
            check_fields(&self.fields, &mut problems);
            template.push_str(" SET ");
            template.push_str(&render_assignments(&mut params, &self.fields, ", "));
        }

        let (text, bindings) = params.finish(&template);
        Query::new(QueryKind::Relate, text, bindings).with_problems(problems)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query_builder::time_now;

    #[test]
    fn relate_renders_both_endpoints() {
        let relation = RecordRelation::new(("person", "john"), "knows", ("person", "david"));
        let q = relate_records(&relation).into_query();
        assert!(q.text().starts_with("RELATE (type::thing($"));
        assert!(q.text().contains(")->knows->(type::thing($"));
        assert_eq!(q.bindings().len(), 4);
        assert_eq!(q.kind(), QueryKind::Relate);
    }

    #[test]
    fn relate_with_edge_content() {
        let relation = RecordRelation::new(("person", "john"), "knows", ("person", "david"));
        let q = relate_records(&relation)
            .set_all([("since", time_now())])
            .into_query();
        assert!(q.text().ends_with(" SET since = time::now()"));
    }
}
