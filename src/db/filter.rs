//! Query filters and pagination
//!
//! A [`Filter`] is a conjunction of `(field path, predicate)` clauses. It
//! renders to a MongoDB query document and can also be evaluated directly
//! against a BSON document, with MongoDB's rules for array fields: equality
//! against an array matches when any element matches, and a missing field
//! compares equal to `null`.

use bson::{oid::ObjectId, Bson, Document};
use std::cmp::Ordering;

/// Default page size when the caller gives none
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// Largest page a caller may request
pub const MAX_PAGE_SIZE: i64 = 100;

/// Predicate on a single field
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Eq(Bson),
    In(Vec<Bson>),
    Range { gte: Option<Bson>, lte: Option<Bson> },
}

/// Conjunction of field predicates
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    clauses: Vec<(String, Predicate)>,
}

impl Filter {
    /// Filter matching every document
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter matching a single document id
    pub fn by_id(id: ObjectId) -> Self {
        Self::new().eq("_id", id)
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.clauses.push((field.into(), Predicate::Eq(value.into())));
        self
    }

    pub fn one_of<I, V>(mut self, field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Bson>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.clauses.push((field.into(), Predicate::In(values)));
        self
    }

    pub fn range(mut self, field: impl Into<String>, gte: Option<Bson>, lte: Option<Bson>) -> Self {
        self.clauses.push((field.into(), Predicate::Range { gte, lte }));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn clauses(&self) -> &[(String, Predicate)] {
        &self.clauses
    }

    /// Render as a MongoDB query document
    pub fn to_document(&self) -> Document {
        let rendered: Vec<Document> = self
            .clauses
            .iter()
            .map(|(field, predicate)| {
                let mut clause = Document::new();
                clause.insert(field.clone(), predicate.to_bson());
                clause
            })
            .collect();

        match rendered.len() {
            0 => Document::new(),
            1 => rendered.into_iter().next().unwrap_or_default(),
            _ => {
                let mut all = Document::new();
                all.insert("$and", rendered);
                all
            }
        }
    }

    /// Evaluate against a document
    pub fn matches(&self, doc: &Document) -> bool {
        self.clauses
            .iter()
            .all(|(field, predicate)| {
                let candidates = lookup(doc, field);
                if candidates.is_empty() {
                    predicate.matches(None)
                } else {
                    candidates.into_iter().any(|value| predicate.matches(Some(value)))
                }
            })
    }
}

impl Predicate {
    fn to_bson(&self) -> Bson {
        match self {
            Predicate::Eq(value) => value.clone(),
            Predicate::In(values) => {
                let mut op = Document::new();
                op.insert("$in", values.clone());
                Bson::Document(op)
            }
            Predicate::Range { gte, lte } => {
                let mut op = Document::new();
                if let Some(gte) = gte {
                    op.insert("$gte", gte.clone());
                }
                if let Some(lte) = lte {
                    op.insert("$lte", lte.clone());
                }
                Bson::Document(op)
            }
        }
    }

    fn matches(&self, field: Option<&Bson>) -> bool {
        match self {
            Predicate::Eq(value) => eq_matches(field, value),
            Predicate::In(values) => values.iter().any(|v| eq_matches(field, v)),
            Predicate::Range { gte, lte } => {
                let in_range = |candidate: &Bson| {
                    let above = gte.as_ref().map_or(true, |lo| {
                        matches!(compare(candidate, lo), Some(Ordering::Greater | Ordering::Equal))
                    });
                    let below = lte.as_ref().map_or(true, |hi| {
                        matches!(compare(candidate, hi), Some(Ordering::Less | Ordering::Equal))
                    });
                    above && below
                };
                match field {
                    Some(Bson::Array(items)) => items.iter().any(in_range),
                    Some(value) => in_range(value),
                    None => false,
                }
            }
        }
    }
}

fn eq_matches(field: Option<&Bson>, expected: &Bson) -> bool {
    match field {
        None => matches!(expected, Bson::Null),
        Some(Bson::Array(items)) => {
            items.iter().any(|item| item == expected)
                || matches!(expected, Bson::Array(arr) if arr == items)
        }
        Some(value) => value == expected,
    }
}

/// Every value a dotted path reaches; an array along the way fans out to
/// the matching field of each of its documents
fn lookup<'a>(doc: &'a Document, path: &str) -> Vec<&'a Bson> {
    let segments: Vec<&str> = path.split('.').collect();
    let mut found = Vec::new();
    if let Some((first, rest)) = segments.split_first() {
        if let Some(value) = doc.get(*first) {
            descend(value, rest, &mut found);
        }
    }
    found
}

fn descend<'a>(value: &'a Bson, rest: &[&str], found: &mut Vec<&'a Bson>) {
    let Some((segment, tail)) = rest.split_first() else {
        found.push(value);
        return;
    };
    match value {
        Bson::Document(inner) => {
            if let Some(next) = inner.get(*segment) {
                descend(next, tail, found);
            }
        }
        Bson::Array(items) => {
            for item in items {
                if let Some(next) = item.as_document().and_then(|inner| inner.get(*segment)) {
                    descend(next, tail, found);
                }
            }
        }
        _ => {}
    }
}

fn compare(a: &Bson, b: &Bson) -> Option<Ordering> {
    fn numeric(v: &Bson) -> Option<f64> {
        match v {
            Bson::Int32(n) => Some(f64::from(*n)),
            Bson::Int64(n) => Some(*n as f64),
            Bson::Double(n) => Some(*n),
            _ => None,
        }
    }

    if let (Some(x), Some(y)) = (numeric(a), numeric(b)) {
        return x.partial_cmp(&y);
    }

    match (a, b) {
        (Bson::String(x), Bson::String(y)) => Some(x.cmp(y)),
        (Bson::DateTime(x), Bson::DateTime(y)) => Some(x.cmp(y)),
        (Bson::ObjectId(x), Bson::ObjectId(y)) => Some(x.cmp(y)),
        (Bson::Boolean(x), Bson::Boolean(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Offset/limit window over an id-ordered result set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub offset: u64,
    pub limit: i64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Pagination {
    /// Build a window, clamping the limit to `1..=MAX_PAGE_SIZE`
    pub fn new(offset: Option<u64>, limit: Option<i64>) -> Self {
        Self {
            offset: offset.unwrap_or(0),
            limit: limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// The same window with one extra slot, used to detect a following page
    pub(crate) fn with_lookahead(&self) -> Self {
        Self {
            offset: self.offset,
            limit: self.limit + 1,
        }
    }
}

/// One page of results
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub has_more: bool,
}

impl<T> Page<T> {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            has_more: false,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            has_more: self.has_more,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn test_eq_on_scalar_and_array() {
        let tag = ObjectId::new();
        let other = ObjectId::new();
        let d = doc! { "name": "Food bank", "tags": [tag] };

        assert!(Filter::new().eq("name", "Food bank").matches(&d));
        assert!(Filter::new().eq("tags", tag).matches(&d));
        assert!(!Filter::new().eq("tags", other).matches(&d));
    }

    #[test]
    fn test_missing_field_equals_null() {
        let d = doc! { "name": "x" };
        assert!(Filter::new().eq("user_id", Bson::Null).matches(&d));
        assert!(!Filter::new().eq("user_id", ObjectId::new()).matches(&d));
    }

    #[test]
    fn test_dotted_path_through_array_of_documents() {
        let org = ObjectId::new();
        let other = ObjectId::new();
        let d = doc! {
            "roles": [
                { "org_id": other, "permission": "VIEWER" },
                { "org_id": org, "permission": "ADMIN" },
            ]
        };

        assert!(Filter::new().eq("roles.org_id", org).matches(&d));
        assert!(Filter::new().one_of("roles.permission", ["ADMIN"]).matches(&d));
        assert!(!Filter::new().eq("roles.org_id", ObjectId::new()).matches(&d));
        assert!(!Filter::new().eq("roles.missing", org).matches(&d));

        let none = doc! { "roles": [] };
        assert!(!Filter::new().eq("roles.org_id", org).matches(&none));
    }

    #[test]
    fn test_in_and_range() {
        let d = doc! { "status": "OPEN", "score": 7, "metadata": { "is_deleted": false } };

        assert!(Filter::new().one_of("status", ["OPEN", "ASSIGNED"]).matches(&d));
        assert!(!Filter::new().one_of("status", ["CLOSED"]).matches(&d));
        assert!(Filter::new()
            .range("score", Some(Bson::Int32(5)), Some(Bson::Int64(7)))
            .matches(&d));
        assert!(!Filter::new().range("score", Some(Bson::Int32(8)), None).matches(&d));
        assert!(Filter::new().eq("metadata.is_deleted", false).matches(&d));
    }

    #[test]
    fn test_to_document_single_and_conjunction() {
        let org = ObjectId::new();
        assert_eq!(Filter::new().eq("org_id", org).to_document(), doc! { "org_id": org });

        let rendered = Filter::new()
            .eq("org_id", org)
            .one_of("status", ["OPEN"])
            .to_document();
        assert_eq!(
            rendered,
            doc! { "$and": [ { "org_id": org }, { "status": { "$in": ["OPEN"] } } ] }
        );
        assert_eq!(Filter::new().to_document(), Document::new());
    }

    #[test]
    fn test_pagination_clamps_limit() {
        assert_eq!(Pagination::new(None, None).limit, DEFAULT_PAGE_SIZE);
        assert_eq!(Pagination::new(Some(5), Some(0)).limit, 1);
        assert_eq!(Pagination::new(None, Some(10_000)).limit, MAX_PAGE_SIZE);
        assert_eq!(Pagination::new(Some(5), Some(10)).with_lookahead().limit, 11);
    }
}
