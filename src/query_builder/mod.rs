//! Pure constructors for query descriptors.
//!
//! Builders never touch a connection. Each fluent step consumes the builder and
//! returns a new value; [`IntoQuery::into_query`] renders the final [`Query`].
//! Input is not rejected at build time. Problems such as an empty table name are
//! recorded on the descriptor and reported when the transaction is composed.

use std::collections::hash_map::DefaultHasher;
use std::fmt::Write as _;
use std::hash::{Hash, Hasher};
use std::iter::Peekable;
use std::str::CharIndices;

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value as JsonValue;

use crate::error::SurqlMiddlewareError;
use crate::types::Bindings;

mod count;
mod create;
mod delete;
mod expr;
mod let_value;
mod raw;
mod relate;
mod select;

pub use count::{Count, count};
pub use create::{Create, create, create_record};
pub use delete::{del_record, del_relation};
pub use expr::{FieldValue, Raw, eq, raw, time_now};
pub use let_value::{LetValue, let_value};
pub use raw::query;
pub use relate::{Relate, relate_records};
pub use select::{Ordering, Select, select, select_all};

lazy_static! {
    static ref IDENT: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid regex");
    static ref FIELD_PATH: Regex =
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$").expect("valid regex");
    static ref LET_STATEMENT: Regex = Regex::new(r"(?i)^\s*LET\s+\$").expect("valid regex");
}

/// Marks a local parameter name inside a template until the namespace is known.
const PARAM_MARK: char = '\u{0}';

/// Which statement a descriptor renders to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    Create,
    Select,
    Delete,
    Relate,
    Count,
    Let,
    Raw,
}

impl QueryKind {
    /// `LET` statements do not appear in the driver's result list.
    #[must_use]
    pub fn produces_result(self) -> bool {
        !matches!(self, Self::Let)
    }

    /// Kinds for which zero rows is an acceptable `single` outcome.
    #[must_use]
    pub fn tolerates_empty(self) -> bool {
        matches!(self, Self::Delete | Self::Count)
    }
}

/// An immutable, not yet executed query fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    text: String,
    bindings: Bindings,
    kind: QueryKind,
    single: bool,
    problems: Vec<String>,
}

impl Query {
    pub(crate) fn new(kind: QueryKind, text: String, bindings: Bindings) -> Self {
        Self {
            text,
            bindings,
            kind,
            single: false,
            problems: Vec::new(),
        }
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    #[must_use]
    pub fn kind(&self) -> QueryKind {
        self.kind
    }

    /// Whether the descriptor itself asks for a single unwrapped row.
    #[must_use]
    pub fn is_single(&self) -> bool {
        self.single
    }

    /// Expect exactly one row and unwrap it from its sequence.
    #[must_use]
    pub fn single(mut self) -> Self {
        self.single = true;
        self
    }

    /// Bind a caller-named parameter, referenced in the text as `$name`.
    ///
    /// The name is used verbatim; it is not placed in a namespace.
    #[must_use]
    pub fn bind(mut self, name: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        let name = name.into();
        let name = name.strip_prefix('$').unwrap_or(&name).to_string();
        if !IDENT.is_match(&name) {
            self.problems
                .push(format!("parameter name `{name}` is not a valid identifier"));
        }
        self.bindings.insert(name, value.into());
        self
    }

    /// Problems found while building, reported at composition time.
    #[must_use]
    pub fn problems(&self) -> &[String] {
        &self.problems
    }

    /// Fail with a usage error if the descriptor cannot be sent.
    ///
    /// # Errors
    /// Returns `SurqlMiddlewareError::Usage` listing every recorded problem.
    pub fn check(&self) -> Result<(), SurqlMiddlewareError> {
        if self.text.trim().is_empty() {
            return Err(SurqlMiddlewareError::Usage("query text is empty".into()));
        }
        if self.problems.is_empty() {
            Ok(())
        } else {
            Err(SurqlMiddlewareError::Usage(self.problems.join("; ")))
        }
    }

    pub(crate) fn with_single(mut self, single: bool) -> Self {
        self.single = single;
        self
    }

    pub(crate) fn with_problems(mut self, problems: Vec<String>) -> Self {
        self.problems.extend(problems);
        self
    }
}

/// Anything that renders to a [`Query`].
pub trait IntoQuery {
    fn into_query(self) -> Query;
}

impl IntoQuery for Query {
    fn into_query(self) -> Query {
        self
    }
}

/// Collects parameters for one descriptor and assigns them a namespace.
///
/// The namespace is a hash of the rendered template and its values, so two
/// different descriptors never share parameter names while identical ones
/// produce identical text.
#[derive(Debug, Default)]
pub(crate) struct Params {
    entries: Vec<(String, JsonValue)>,
}

impl Params {
    /// Register a value and return the placeholder to splice into the template.
    pub(crate) fn bind(&mut self, local: &str, value: JsonValue) -> String {
        let mut name: String = local
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        if name.is_empty() {
            name.push('v');
        }
        if self.entries.iter().any(|(existing, _)| *existing == name) {
            let base = name.clone();
            let mut n = 1;
            while self.entries.iter().any(|(existing, _)| *existing == name) {
                name = format!("{base}_{n}");
                n += 1;
            }
        }
        let placeholder = format!("{PARAM_MARK}{name}{PARAM_MARK}");
        self.entries.push((name, value));
        placeholder
    }

    /// Resolve every placeholder in `template` into a namespaced `$param`.
    pub(crate) fn finish(self, template: &str) -> (String, Bindings) {
        if self.entries.is_empty() {
            return (template.to_string(), Bindings::new());
        }

        let mut hasher = DefaultHasher::new();
        template.hash(&mut hasher);
        for (name, value) in &self.entries {
            name.hash(&mut hasher);
            value.to_string().hash(&mut hasher);
        }
        let prefix = format!("_p{:016x}_", hasher.finish());

        let mut text = template.to_string();
        let mut bindings = Bindings::new();
        for (name, value) in self.entries {
            let qualified = format!("{prefix}{name}");
            text = text.replace(
                &format!("{PARAM_MARK}{name}{PARAM_MARK}"),
                &format!("${qualified}"),
            );
            bindings.insert(qualified, value);
        }
        (text, bindings)
    }
}

/// Render `value` into the template, binding it unless it is raw.
pub(crate) fn render_value(params: &mut Params, local: &str, value: &FieldValue) -> String {
    match value {
        FieldValue::Value(json) => params.bind(local, json.clone()),
        FieldValue::Raw(expr) => expr.as_str().to_string(),
    }
}

/// Render `field = value, ...` pairs joined by `sep`.
pub(crate) fn render_assignments(
    params: &mut Params,
    fields: &[(String, FieldValue)],
    sep: &str,
) -> String {
    let mut out = String::new();
    for (i, (field, value)) in fields.iter().enumerate() {
        if i > 0 {
            out.push_str(sep);
        }
        let rendered = render_value(params, field, value);
        let _ = write!(out, "{field} = {rendered}");
    }
    out
}

pub(crate) fn check_ident(what: &str, value: &str, problems: &mut Vec<String>) {
    if value.is_empty() {
        problems.push(format!("{what} is empty"));
    } else if !IDENT.is_match(value) {
        problems.push(format!("{what} `{value}` is not a valid identifier"));
    }
}

pub(crate) fn check_field_path(field: &str, problems: &mut Vec<String>) {
    if !FIELD_PATH.is_match(field) {
        problems.push(format!("field name `{field}` is not a valid field path"));
    }
}

pub(crate) fn check_fields(fields: &[(String, FieldValue)], problems: &mut Vec<String>) {
    for (field, _) in fields {
        check_field_path(field, problems);
    }
}

pub(crate) fn is_let_statement(text: &str) -> bool {
    LET_STATEMENT.is_match(text)
}

/// Byte offset of the first `;` that ends a statement inside `text`.
///
/// Separators inside string literals, quoted identifiers, comments, and
/// bracketed blocks or subqueries do not count.
pub(crate) fn statement_terminator(text: &str) -> Option<usize> {
    let mut chars = text.char_indices().peekable();
    let mut depth: usize = 0;
    while let Some((at, c)) = chars.next() {
        let next = chars.peek().map(|&(_, n)| n);
        match c {
            '\'' | '"' | '`' => skip_quoted(&mut chars, c),
            '\u{27e8}' => skip_quoted(&mut chars, '\u{27e9}'),
            '#' => skip_line(&mut chars),
            '-' if next == Some('-') => skip_line(&mut chars),
            '/' if next == Some('/') => skip_line(&mut chars),
            '/' if next == Some('*') => {
                chars.next();
                let mut prev = '\0';
                for (_, c) in chars.by_ref() {
                    if prev == '*' && c == '/' {
                        break;
                    }
                    prev = c;
                }
            }
            '(' | '{' | '[' => depth += 1,
            ')' | '}' | ']' => depth = depth.saturating_sub(1),
            ';' if depth == 0 => return Some(at),
            _ => {}
        }
    }
    None
}

fn skip_quoted(chars: &mut Peekable<CharIndices<'_>>, close: char) {
    while let Some((_, c)) = chars.next() {
        if c == '\\' {
            chars.next();
        } else if c == close {
            return;
        }
    }
}

fn skip_line(chars: &mut Peekable<CharIndices<'_>>) {
    for (_, c) in chars.by_ref() {
        if c == '\n' {
            return;
        }
    }
}

pub(crate) fn collect_fields<I, K, V>(fields: I) -> Vec<(String, FieldValue)>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<FieldValue>,
{
    fields
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn params_are_namespaced_and_deterministic() {
        let mut a = Params::default();
        let pa = a.bind("name", json!("Test"));
        let (text_a, bindings_a) = a.finish(&format!("CREATE t SET name = {pa}"));

        let mut b = Params::default();
        let pb = b.bind("name", json!("Test"));
        let (text_b, _) = b.finish(&format!("CREATE t SET name = {pb}"));

        assert_eq!(text_a, text_b);
        let (key, value) = bindings_a.iter().next().unwrap();
        assert!(key.starts_with("_p") && key.ends_with("_name"));
        assert_eq!(value, &json!("Test"));
        assert!(text_a.contains(&format!("${key}")));
    }

    #[test]
    fn different_values_get_different_namespaces() {
        let mut a = Params::default();
        let pa = a.bind("name", json!("one"));
        let (_, ba) = a.finish(&format!("SET name = {pa}"));
        let mut b = Params::default();
        let pb = b.bind("name", json!("two"));
        let (_, bb) = b.finish(&format!("SET name = {pb}"));
        assert_ne!(ba.keys().next(), bb.keys().next());
    }

    #[test]
    fn duplicate_local_names_are_suffixed() {
        let mut p = Params::default();
        let first = p.bind("id", json!(1));
        let second = p.bind("id", json!(2));
        let (text, bindings) = p.finish(&format!("{first} {second}"));
        assert_eq!(bindings.len(), 2);
        assert!(bindings.keys().any(|k| k.ends_with("_id_1")));
        assert!(!text.contains(PARAM_MARK));
    }

    #[test]
    fn bind_rejects_bad_names_at_check_time() {
        let q = query("SELECT * FROM $x").bind("not valid", 1);
        assert!(matches!(q.check(), Err(SurqlMiddlewareError::Usage(_))));
        let ok = query("SELECT * FROM t WHERE a = $a").bind("$a", 1);
        assert!(ok.check().is_ok());
        assert_eq!(ok.bindings().get("a"), Some(&json!(1)));
    }

    #[test]
    fn terminators_in_literals_and_blocks_are_ignored() {
        assert_eq!(statement_terminator("CREATE a; CREATE b"), Some(8));
        assert_eq!(statement_terminator("SELECT * FROM t WHERE n = 'a;b'"), None);
        assert_eq!(statement_terminator(r#"SELECT * FROM t WHERE n = "it\"s;""#), None);
        assert_eq!(statement_terminator("SELECT * FROM ⟨odd;name⟩"), None);
        assert_eq!(statement_terminator("LET $x = (SELECT * FROM a; )"), None);
        assert_eq!(statement_terminator("SELECT * FROM t -- a; b\nWHERE x = 1"), None);
        assert_eq!(statement_terminator("SELECT /* ; */ * FROM t"), None);
        assert_eq!(statement_terminator("SELECT * FROM t WHERE n = 'a;b'; DELETE t"), Some(31));
    }

    #[test]
    fn let_detection_is_case_insensitive() {
        assert!(is_let_statement("  let $x = 1"));
        assert!(is_let_statement("LET $orgs = (SELECT * FROM org)"));
        assert!(!is_let_statement("SELECT * FROM letters"));
    }
}
