use super::{Query, QueryKind, is_let_statement, statement_terminator};

/// Pass `text` through unchanged as one statement.
///
/// Trailing terminators are stripped so the composer controls separators.
/// Text holding more than one statement is rejected when composed, since the
/// result list could no longer be aligned with the items.
/// Text beginning with `LET $` is classified as a binding and yields no row.
///
/// ```rust
/// use surql_middleware::prelude::*;
///
/// let q = query("INFO FOR DB;").single();
/// assert_eq!(q.text(), "INFO FOR DB");
/// assert!(q.is_single());
/// ```
#[must_use]
pub fn query(text: impl Into<String>) -> Query {
    let text = text.into();
    let text = text.trim().trim_end_matches(';').trim_end().to_string();
    let kind = if is_let_statement(&text) {
        QueryKind::Let
    } else {
        QueryKind::Raw
    };
    let mut problems = Vec::new();
    if let Some(at) = statement_terminator(&text) {
        problems.push(format!("raw query holds more than one statement (`;` at byte {at})"));
    }
    Query::new(kind, text, Default::default()).with_problems(problems)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_text_is_trimmed() {
        let q = query("  SELECT * FROM test ;; ");
        assert_eq!(q.text(), "SELECT * FROM test");
        assert_eq!(q.kind(), QueryKind::Raw);
        assert!(!q.is_single());
    }

    #[test]
    fn raw_let_is_a_binding() {
        assert_eq!(query("let $x = 1").kind(), QueryKind::Let);
    }

    #[test]
    fn several_statements_are_rejected() {
        let q = query("CREATE a; CREATE b;");
        assert_eq!(q.text(), "CREATE a; CREATE b");
        let err = q.check().unwrap_err().to_string();
        assert!(err.contains("more than one statement"));

        assert!(query("SELECT * FROM t WHERE note = 'a; b';").check().is_ok());
    }

    #[test]
    fn empty_raw_text_is_rejected() {
        assert!(query(" ; ").check().is_err());
    }
}
