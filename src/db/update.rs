//! Atomic document updates
//!
//! An [`Update`] is a list of field operators applied to one document in a
//! single step. It renders to MongoDB update operators and can also be
//! applied in place to a BSON document, so list and counter changes never
//! go through a read-modify-replace cycle.

use bson::{Bson, Document};

use crate::types::{CaseworkError, Result};

/// Operator applied to a single field
#[derive(Debug, Clone, PartialEq)]
pub enum Operator {
    /// Overwrite the field
    Set(Bson),
    /// Append to an array unless an equal element is present
    AddToSet(Bson),
    /// Remove matching array elements; a document value matches elements
    /// whose fields equal each of its fields
    Pull(Bson),
    /// Add to a numeric field, treating a missing field as zero
    Inc(Bson),
}

impl Operator {
    fn name(&self) -> &'static str {
        match self {
            Operator::Set(_) => "$set",
            Operator::AddToSet(_) => "$addToSet",
            Operator::Pull(_) => "$pull",
            Operator::Inc(_) => "$inc",
        }
    }

    fn value(&self) -> &Bson {
        match self {
            Operator::Set(v) | Operator::AddToSet(v) | Operator::Pull(v) | Operator::Inc(v) => v,
        }
    }
}

/// Field operators applied together to one document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    ops: Vec<(String, Operator)>,
}

impl Update {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(self, field: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.with(field, Operator::Set(value.into()))
    }

    pub fn add_to_set(self, field: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.with(field, Operator::AddToSet(value.into()))
    }

    pub fn pull(self, field: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.with(field, Operator::Pull(value.into()))
    }

    pub fn inc(self, field: impl Into<String>, by: impl Into<Bson>) -> Self {
        self.with(field, Operator::Inc(by.into()))
    }

    fn with(mut self, field: impl Into<String>, op: Operator) -> Self {
        self.ops.push((field.into(), op));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Render as a MongoDB update document, grouped by operator
    pub fn to_document(&self) -> Document {
        let mut rendered = Document::new();
        for (field, op) in &self.ops {
            let group = rendered
                .entry(op.name().to_string())
                .or_insert_with(|| Bson::Document(Document::new()));
            if let Bson::Document(group) = group {
                group.insert(field.clone(), op.value().clone());
            }
        }
        rendered
    }

    /// Apply every operator to `doc` in order
    pub fn apply(&self, doc: &mut Document) -> Result<()> {
        for (field, op) in &self.ops {
            let (parent, key) = parent_mut(doc, field)?;
            match op {
                Operator::Set(value) => {
                    parent.insert(key, value.clone());
                }
                Operator::AddToSet(value) => match parent.get_mut(key) {
                    Some(Bson::Array(items)) => {
                        if !items.contains(value) {
                            items.push(value.clone());
                        }
                    }
                    None | Some(Bson::Null) => {
                        parent.insert(key, Bson::Array(vec![value.clone()]));
                    }
                    Some(_) => return Err(not_an_array(field)),
                },
                Operator::Pull(condition) => match parent.get_mut(key) {
                    Some(Bson::Array(items)) => items.retain(|item| !pull_matches(item, condition)),
                    None | Some(Bson::Null) => {}
                    Some(_) => return Err(not_an_array(field)),
                },
                Operator::Inc(by) => {
                    let current = parent.get(key).cloned().unwrap_or(Bson::Int32(0));
                    let sum = add(&current, by).ok_or_else(|| {
                        CaseworkError::Database(format!("Cannot increment non-numeric field '{}'", field))
                    })?;
                    parent.insert(key, sum);
                }
            }
        }
        Ok(())
    }
}

/// The document holding the last segment of `path`, creating
/// intermediate documents as needed
fn parent_mut<'d, 'p>(doc: &'d mut Document, path: &'p str) -> Result<(&'d mut Document, &'p str)> {
    let mut segments: Vec<&str> = path.split('.').collect();
    let last = segments
        .pop()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| CaseworkError::Internal(format!("Invalid update path '{}'", path)))?;

    let mut current = doc;
    for segment in segments {
        if !current.contains_key(segment) {
            current.insert(segment, Document::new());
        }
        current = match current.get_mut(segment) {
            Some(Bson::Document(inner)) => inner,
            _ => {
                return Err(CaseworkError::Database(format!(
                    "Update path '{}' crosses a non-document field",
                    path
                )))
            }
        };
    }
    Ok((current, last))
}

fn pull_matches(item: &Bson, condition: &Bson) -> bool {
    match (item, condition) {
        (Bson::Document(item), Bson::Document(fields)) => {
            fields.iter().all(|(k, v)| item.get(k) == Some(v))
        }
        _ => item == condition,
    }
}

fn add(a: &Bson, b: &Bson) -> Option<Bson> {
    Some(match (a, b) {
        (Bson::Int32(x), Bson::Int32(y)) => match x.checked_add(*y) {
            Some(sum) => Bson::Int32(sum),
            None => Bson::Int64(i64::from(*x) + i64::from(*y)),
        },
        (Bson::Int32(x), Bson::Int64(y)) => Bson::Int64(i64::from(*x).checked_add(*y)?),
        (Bson::Int64(x), Bson::Int32(y)) => Bson::Int64(x.checked_add(i64::from(*y))?),
        (Bson::Int64(x), Bson::Int64(y)) => Bson::Int64(x.checked_add(*y)?),
        (Bson::Double(x), Bson::Double(y)) => Bson::Double(x + y),
        (Bson::Double(x), Bson::Int32(y)) => Bson::Double(x + f64::from(*y)),
        (Bson::Int32(x), Bson::Double(y)) => Bson::Double(f64::from(*x) + y),
        _ => return None,
    })
}

fn not_an_array(field: &str) -> CaseworkError {
    CaseworkError::Database(format!("Field '{}' is not an array", field))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::{doc, oid::ObjectId};

    #[test]
    fn test_renders_grouped_operators() {
        let id = ObjectId::new();
        let update = Update::new()
            .add_to_set("tags", id)
            .set("name", "Harbor House")
            .set("metadata.updated_at", 5)
            .inc("token_version", 1);

        assert_eq!(
            update.to_document(),
            doc! {
                "$addToSet": { "tags": id },
                "$set": { "name": "Harbor House", "metadata.updated_at": 5 },
                "$inc": { "token_version": 1 },
            }
        );
    }

    #[test]
    fn test_add_to_set_and_pull() {
        let a = ObjectId::new();
        let b = ObjectId::new();
        let mut doc = doc! { "tags": [a] };

        Update::new().add_to_set("tags", a).add_to_set("tags", b).apply(&mut doc).unwrap();
        assert_eq!(doc.get_array("tags").unwrap(), &vec![Bson::from(a), Bson::from(b)]);

        Update::new().pull("tags", a).apply(&mut doc).unwrap();
        assert_eq!(doc.get_array("tags").unwrap(), &vec![Bson::from(b)]);

        // Missing arrays are created
        Update::new().add_to_set("contacts", a).apply(&mut doc).unwrap();
        assert_eq!(doc.get_array("contacts").unwrap().len(), 1);
    }

    #[test]
    fn test_pull_by_document_fields() {
        let org = ObjectId::new();
        let other = ObjectId::new();
        let mut doc = doc! {
            "roles": [
                { "org_id": org, "permission": "VIEWER" },
                { "org_id": other, "permission": "ADMIN" },
            ]
        };

        Update::new().pull("roles", doc! { "org_id": org }).apply(&mut doc).unwrap();
        let roles = doc.get_array("roles").unwrap();
        assert_eq!(roles.len(), 1);
        assert_eq!(roles[0].as_document().unwrap().get_object_id("org_id").unwrap(), other);
    }

    #[test]
    fn test_inc_and_nested_set() {
        let mut doc = doc! { "token_version": 1, "metadata": { "is_deleted": false } };
        Update::new()
            .inc("token_version", 1)
            .inc("missing", 2)
            .set("metadata.updated_at", "now")
            .apply(&mut doc)
            .unwrap();

        assert_eq!(doc.get_i32("token_version").unwrap(), 2);
        assert_eq!(doc.get_i32("missing").unwrap(), 2);
        assert_eq!(doc.get_document("metadata").unwrap().get_str("updated_at").unwrap(), "now");

        let mut text = doc! { "name": "x" };
        assert!(Update::new().inc("name", 1).apply(&mut text).is_err());
        assert!(Update::new().add_to_set("name", 1).apply(&mut text).is_err());
    }
}
