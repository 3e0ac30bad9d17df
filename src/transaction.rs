//! Transaction items and the composer that merges them into one statement.

use std::fmt;

use crate::error::SurqlMiddlewareError;
use crate::query_builder::{IntoQuery, Query, QueryKind};
use crate::schema::{Schema, SharedValidator, Validator};
use crate::types::Bindings;

pub const TRANSACTION_BEGIN: &str = "BEGIN TRANSACTION;\n";
pub const TRANSACTION_COMMIT: &str = "COMMIT TRANSACTION;";
pub const STATEMENT_SEPARATOR: &str = ";\n";

/// A descriptor plus how its result should be shaped and validated.
///
/// ```rust
/// use surql_middleware::prelude::*;
///
/// let item = TransactionItem::new(query("INFO FOR DB").single()).skip_validation();
/// assert!(item.is_single());
/// assert!(!item.validates());
/// ```
#[derive(Clone)]
#[must_use]
pub struct TransactionItem {
    query: Query,
    schema: Option<SharedValidator>,
    single: Option<bool>,
    validate: bool,
}

impl TransactionItem {
    pub fn new(query: impl IntoQuery) -> Self {
        Self {
            query: query.into_query(),
            schema: None,
            single: None,
            validate: true,
        }
    }

    /// Validate the result with `schema`.
    pub fn schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema.into_shared());
        self
    }

    /// Validate the result with any [`Validator`].
    pub fn validator(mut self, validator: impl Validator + 'static) -> Self {
        self.schema = Some(std::sync::Arc::new(validator));
        self
    }

    /// Override the descriptor's own single-row expectation.
    pub fn single(mut self, single: bool) -> Self {
        self.single = Some(single);
        self
    }

    /// Return the raw driver value untouched; the schema is never consulted.
    pub fn skip_validation(mut self) -> Self {
        self.validate = false;
        self
    }

    #[must_use]
    pub fn query(&self) -> &Query {
        &self.query
    }

    #[must_use]
    pub fn is_single(&self) -> bool {
        self.single.unwrap_or(self.query.is_single())
    }

    #[must_use]
    pub fn validates(&self) -> bool {
        self.validate
    }

    pub(crate) fn validator_ref(&self) -> Option<&SharedValidator> {
        self.schema.as_ref()
    }
}

impl fmt::Debug for TransactionItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionItem")
            .field("query", &self.query)
            .field("has_schema", &self.schema.is_some())
            .field("single", &self.single)
            .field("validate", &self.validate)
            .finish()
    }
}

impl From<Query> for TransactionItem {
    fn from(query: Query) -> Self {
        Self::new(query)
    }
}

impl From<crate::query_builder::Create> for TransactionItem {
    fn from(value: crate::query_builder::Create) -> Self {
        Self::new(value)
    }
}

impl From<crate::query_builder::Select> for TransactionItem {
    fn from(value: crate::query_builder::Select) -> Self {
        Self::new(value)
    }
}

impl From<crate::query_builder::Count> for TransactionItem {
    fn from(value: crate::query_builder::Count) -> Self {
        Self::new(value)
    }
}

impl From<crate::query_builder::Relate> for TransactionItem {
    fn from(value: crate::query_builder::Relate) -> Self {
        Self::new(value)
    }
}

/// How one item's slice of the driver response must be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseSlot {
    pub kind: QueryKind,
    pub expects_result: bool,
    pub single: bool,
}

/// The wire-level statement for a whole transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedStatement {
    pub text: String,
    pub bindings: Bindings,
    pub item_count: usize,
    pub slots: Vec<ResponseSlot>,
}

impl ComposedStatement {
    /// Number of entries the driver is expected to return.
    #[must_use]
    pub fn expected_results(&self) -> usize {
        self.slots.iter().filter(|slot| slot.expects_result).count()
    }
}

/// Merge `items` into one atomic statement.
///
/// Statements keep their order, so the composed text of the first `k` items is
/// a prefix of the composed text of all of them (up to the commit marker).
///
/// # Errors
/// Returns `SurqlMiddlewareError::Usage` for an empty transaction, for a
/// descriptor with recorded problems, or when two items bind the same
/// parameter name to different values.
pub fn compose(items: &[TransactionItem]) -> Result<ComposedStatement, SurqlMiddlewareError> {
    if items.is_empty() {
        return Err(SurqlMiddlewareError::Usage(
            "a transaction needs at least one item".into(),
        ));
    }

    let mut text = String::from(TRANSACTION_BEGIN);
    let mut bindings = Bindings::new();
    let mut slots = Vec::with_capacity(items.len());

    for (index, item) in items.iter().enumerate() {
        let query = item.query();
        query.check().map_err(|err| match err {
            SurqlMiddlewareError::Usage(msg) => {
                SurqlMiddlewareError::Usage(format!("item {index}: {msg}"))
            }
            other => other,
        })?;

        for (name, value) in query.bindings() {
            match bindings.get(name) {
                Some(existing) if existing != value => {
                    return Err(SurqlMiddlewareError::Usage(format!(
                        "item {index}: parameter `${name}` is already bound to a different value"
                    )));
                }
                Some(_) => {}
                None => {
                    bindings.insert(name.clone(), value.clone());
                }
            }
        }

        text.push_str(query.text());
        text.push_str(STATEMENT_SEPARATOR);
        slots.push(ResponseSlot {
            kind: query.kind(),
            expects_result: query.kind().produces_result(),
            single: item.is_single(),
        });
    }
    text.push_str(TRANSACTION_COMMIT);

    Ok(ComposedStatement {
        text,
        bindings,
        item_count: items.len(),
        slots,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query_builder::{count, create, let_value, query, select, select_all};
    use serde_json::json;

    fn three() -> Vec<TransactionItem> {
        vec![
            create("organisation").set("name", "Test").into(),
            count("organisation").into(),
            select(&["id"]).from("organisation").into(),
        ]
    }

    #[test]
    fn empty_transaction_is_a_usage_error() {
        assert!(matches!(compose(&[]), Err(SurqlMiddlewareError::Usage(_))));
    }

    #[test]
    fn statements_are_wrapped_and_separated() {
        let composed = compose(&[TransactionItem::from(query("INFO FOR DB"))]).unwrap();
        assert_eq!(
            composed.text,
            "BEGIN TRANSACTION;\nINFO FOR DB;\nCOMMIT TRANSACTION;"
        );
        assert_eq!(composed.item_count, 1);
        assert_eq!(composed.expected_results(), 1);
    }

    #[test]
    fn composition_is_prefix_stable() {
        let items = three();
        let full = compose(&items).unwrap();
        for k in 1..=items.len() {
            let part = compose(&items[..k]).unwrap();
            let head = part.text.strip_suffix(TRANSACTION_COMMIT).unwrap();
            assert!(full.text.starts_with(head), "prefix {k} diverged");
        }
    }

    #[test]
    fn let_items_expect_no_result() {
        let items: Vec<TransactionItem> = vec![
            let_value("orgs", select(&["name"]).from("organisation")).into(),
            select_all().from("$orgs").into(),
        ];
        let composed = compose(&items).unwrap();
        assert!(composed.text.contains("SELECT * FROM $orgs;\n"));
        assert_eq!(composed.expected_results(), 1);
        assert!(!composed.slots[0].expects_result);
        assert!(composed.slots[1].expects_result);
    }

    #[test]
    fn item_single_overrides_descriptor() {
        let items = vec![
            TransactionItem::new(count("organisation")).single(false),
            TransactionItem::new(select_all().from("t")).single(true),
        ];
        let composed = compose(&items).unwrap();
        assert!(!composed.slots[0].single);
        assert!(composed.slots[1].single);
    }

    #[test]
    fn problems_name_the_failing_item() {
        let items: Vec<TransactionItem> = vec![query("INFO FOR DB").into(), create("").into()];
        let err = compose(&items).unwrap_err().to_string();
        assert!(err.contains("item 1"), "{err}");
    }

    #[test]
    fn conflicting_caller_bindings_are_rejected() {
        let items = vec![
            TransactionItem::new(query("SELECT * FROM t WHERE a = $a").bind("a", 1)),
            TransactionItem::new(query("SELECT * FROM u WHERE a = $a").bind("a", 2)),
        ];
        assert!(matches!(compose(&items), Err(SurqlMiddlewareError::Usage(_))));

        let same = vec![
            TransactionItem::new(query("SELECT * FROM t WHERE a = $a").bind("a", 1)),
            TransactionItem::new(query("SELECT * FROM u WHERE a = $a").bind("a", 1)),
        ];
        let composed = compose(&same).unwrap();
        assert_eq!(composed.bindings.get("a"), Some(&json!(1)));
    }

    #[test]
    fn independent_creates_do_not_collide() {
        let items: Vec<TransactionItem> = vec![
            create("person").set("name", "john").into(),
            create("person").set("name", "david").into(),
        ];
        let composed = compose(&items).unwrap();
        assert_eq!(composed.bindings.len(), 2);
    }
}
