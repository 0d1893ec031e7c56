//! Structural diff of two decoded documents.
//!
//! Comparison resolves references on both sides, walks classes by
//! member-name union and arrays by index union, and reduces leaves to
//! canonical text. Structural mismatches never fail the diff; they
//! surface as a single `Modified` at the deepest common path.

use std::collections::HashSet;

use serde::Serialize;

use crate::document::{join_index, join_member, Document};
use crate::guid;
use crate::record::{NrbfRecord, RecordId, Value};

/// What happened to a field between two documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChangeKind {
    Modified,
    Added,
    Removed,
}

/// One difference, in pre-order position of the before tree. Fields
/// that only exist after the change appear where they occur in the
/// after tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldChange {
    pub path: String,
    pub kind: ChangeKind,
    pub old: Option<String>,
    pub new: Option<String>,
}

/// Compare two documents and list every differing field.
pub fn diff(before: &Document, after: &Document) -> Vec<FieldChange> {
    let mut differ = Differ {
        before,
        after,
        visited: HashSet::new(),
        out: Vec::new(),
    };
    differ.compare_values(
        "",
        Some(Value::Record(before.root())),
        Some(Value::Record(after.root())),
    );
    differ.out
}

struct Differ<'a> {
    before: &'a Document,
    after: &'a Document,
    visited: HashSet<(i32, i32)>,
    out: Vec<FieldChange>,
}

impl Differ<'_> {
    fn push(&mut self, path: &str, kind: ChangeKind, old: Option<String>, new: Option<String>) {
        self.out.push(FieldChange {
            path: path.to_string(),
            kind,
            old,
            new,
        });
    }

    /// Resolve one reference hop, keeping dangling references as their
    /// own distinguished value.
    fn settle(doc: &Document, value: Value, path: &str) -> Value {
        match doc.resolve(&value) {
            Ok(resolved) => resolved,
            Err(_) => {
                doc.log(&format!("dangling reference at {path} during diff"));
                value
            }
        }
    }

    fn compare_values(&mut self, path: &str, a: Option<Value>, b: Option<Value>) {
        match (a, b) {
            (None, None) => {}
            (Some(a), None) => {
                let old = self.before.value_text(&a);
                self.push(path, ChangeKind::Removed, Some(old), None);
            }
            (None, Some(b)) => {
                let new = self.after.value_text(&b);
                self.push(path, ChangeKind::Added, None, Some(new));
            }
            (Some(a), Some(b)) => {
                let a = Self::settle(self.before, a, path);
                let b = Self::settle(self.after, b, path);
                match (&a, &b) {
                    (Value::Record(ra), Value::Record(rb)) => {
                        self.compare_records(path, *ra, *rb)
                    }
                    _ => self.compare_leaves(path, &a, &b),
                }
            }
        }
    }

    fn compare_leaves(&mut self, path: &str, a: &Value, b: &Value) {
        let old = self.before.value_text(a);
        let new = self.after.value_text(b);
        if old != new {
            self.push(path, ChangeKind::Modified, Some(old), Some(new));
        }
    }

    fn compare_records(&mut self, path: &str, ra: RecordId, rb: RecordId) {
        let rec_a = self.before.record(ra);
        let rec_b = self.after.record(rb);

        if let (NrbfRecord::Class(ca), NrbfRecord::Class(cb)) = (rec_a, rec_b) {
            // GUIDs compare by canonical text, never field by field.
            if let (Some(ga), Some(gb)) = (guid::guid_text(ca), guid::guid_text(cb)) {
                if ga != gb {
                    self.push(path, ChangeKind::Modified, Some(ga), Some(gb));
                }
                return;
            }
            if ca.info.name != cb.info.name {
                self.push(
                    path,
                    ChangeKind::Modified,
                    Some(ca.info.name.clone()),
                    Some(cb.info.name.clone()),
                );
                return;
            }
            if !self.enter(rec_a, rec_b) {
                return;
            }
            // Union of member names: before's order first, then names
            // that only the after side has.
            let mut names: Vec<&str> = ca.info.member_names.iter().map(String::as_str).collect();
            for name in &cb.info.member_names {
                if ca.member_index(name).is_none() {
                    names.push(name);
                }
            }
            for name in names {
                self.compare_values(
                    &join_member(path, name),
                    ca.member_value(name),
                    cb.member_value(name),
                );
            }
            return;
        }

        let elements_a = self.before.array_elements(rec_a);
        let elements_b = self.after.array_elements(rec_b);
        if let (Some(ea), Some(eb)) = (elements_a, elements_b) {
            if !self.enter(rec_a, rec_b) {
                return;
            }
            for index in 0..ea.len().max(eb.len()) {
                self.compare_values(
                    &join_index(path, index),
                    ea.get(index).cloned(),
                    eb.get(index).cloned(),
                );
            }
            return;
        }

        // Mismatched record kinds, or plain leaf records like strings.
        let a = Value::Record(ra);
        let b = Value::Record(rb);
        self.compare_leaves(path, &a, &b);
    }

    /// Guard recursion on the id pair so reference cycles terminate.
    fn enter(&mut self, a: &NrbfRecord, b: &NrbfRecord) -> bool {
        match (a.object_id(), b.object_id()) {
            (Some(ia), Some(ib)) => self.visited.insert((ia, ib)),
            _ => true,
        }
    }
}
