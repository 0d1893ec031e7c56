//! The decoded object graph and its query surface.
//!
//! A [`Document`] owns every record decoded from a stream: an arena of
//! records, the order they appeared on the wire, and the id maps that
//! make reference resolution and `ClassWithId` metadata reuse work.
//! Everything is dropped together when the document goes away.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::Serialize;

use crate::error::NrbfError;
use crate::guid;
use crate::record::{NrbfRecord, RecordId, Slot, Value};

/// Fields of the serialization header record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StreamHeader {
    pub root_id: i32,
    pub header_id: i32,
    pub major_version: i32,
    pub minor_version: i32,
}

/// Per-kind record counts, computed on demand after a load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentStats {
    pub records: usize,
    pub classes: usize,
    pub strings: usize,
    pub arrays: usize,
    pub libraries: usize,
    pub references: usize,
    pub null_values: usize,
    pub primitive_values: usize,
}

/// Callback receiving diagnostic messages during traversal.
pub type LogSink = Box<dyn Fn(&str)>;

/// A decoded NRBF stream: the record graph plus everything needed to
/// write it back out byte for byte.
pub struct Document {
    pub(crate) header: StreamHeader,
    pub(crate) records: Vec<NrbfRecord>,
    pub(crate) order: Vec<RecordId>,
    pub(crate) identity: HashMap<i32, RecordId>,
    pub(crate) metadata: HashMap<i32, RecordId>,
    pub(crate) libraries: HashMap<i32, String>,
    pub(crate) root: RecordId,
    pub(crate) wide_char: bool,
    pub(crate) log_sink: Option<LogSink>,
}

impl Document {
    /// Build a document from loose records, without any wire ordering.
    ///
    /// Intended for synthetic graphs; saving such a document falls back
    /// to structural emission. Records are registered in the identity
    /// and metadata maps exactly as the decoder would register them.
    pub fn from_records(
        header: StreamHeader,
        records: Vec<NrbfRecord>,
        libraries: HashMap<i32, String>,
    ) -> Result<Self, NrbfError> {
        let mut identity = HashMap::new();
        let mut metadata = HashMap::new();
        for (index, record) in records.iter().enumerate() {
            let rid = RecordId(index);
            if matches!(record, NrbfRecord::Library(_)) {
                continue;
            }
            if let Some(id) = record.object_id() {
                if identity.insert(id, rid).is_some() {
                    return Err(NrbfError::DuplicateObjectId(id));
                }
            }
            if let NrbfRecord::Class(class) = record {
                if class.metadata_id.is_none() {
                    metadata.insert(class.info.object_id, rid);
                }
            }
        }
        let root = identity
            .get(&header.root_id)
            .copied()
            .ok_or(NrbfError::RootNotFound(header.root_id))?;
        Ok(Self {
            header,
            records,
            order: Vec::new(),
            identity,
            metadata,
            libraries,
            root,
            wide_char: false,
            log_sink: None,
        })
    }

    pub fn header(&self) -> &StreamHeader {
        &self.header
    }

    /// Records in the order they appeared on the wire, libraries
    /// included, framing excluded. Empty for synthetic documents.
    pub fn records_in_order(&self) -> impl Iterator<Item = &NrbfRecord> + '_ {
        self.order.iter().map(|rid| &self.records[rid.0])
    }

    pub fn record(&self, rid: RecordId) -> &NrbfRecord {
        &self.records[rid.0]
    }

    pub(crate) fn record_mut(&mut self, rid: RecordId) -> &mut NrbfRecord {
        &mut self.records[rid.0]
    }

    /// Handle of the record the header's root id points at.
    pub fn root(&self) -> RecordId {
        self.root
    }

    pub fn root_record(&self) -> &NrbfRecord {
        self.record(self.root)
    }

    /// Look up a record by object id.
    pub fn lookup(&self, object_id: i32) -> Option<RecordId> {
        self.identity.get(&object_id).copied()
    }

    /// Library name for a library id.
    pub fn library_name(&self, library_id: i32) -> Option<&str> {
        self.libraries.get(&library_id).map(String::as_str)
    }

    /// Follow a reference one hop; all other values pass through
    /// unchanged.
    pub fn resolve(&self, value: &Value) -> Result<Value, NrbfError> {
        match value {
            Value::Reference(id) => self
                .lookup(*id)
                .map(Value::Record)
                .ok_or(NrbfError::DanglingReference(*id)),
            other => Ok(other.clone()),
        }
    }

    /// Expanded element values for any of the four array record kinds.
    pub fn array_elements(&self, record: &NrbfRecord) -> Option<Vec<Value>> {
        match record {
            NrbfRecord::PrimitiveArray(a) => Some(a.elements().collect()),
            NrbfRecord::ObjectArray(a) => Some(a.elements().collect()),
            NrbfRecord::StringArray(a) => Some(a.elements().collect()),
            NrbfRecord::BinaryArray(a) => Some(a.elements().collect()),
            _ => None,
        }
    }

    /// Install a callback for traversal diagnostics (dangling references
    /// and the like). The default is to say nothing.
    pub fn set_log_sink(&mut self, sink: impl Fn(&str) + 'static) {
        self.log_sink = Some(Box::new(sink));
    }

    pub(crate) fn log(&self, message: &str) {
        if let Some(sink) = &self.log_sink {
            sink(message);
        }
    }

    /// Short human-readable rendering of a value, used by the diff
    /// engine and display layers. Strings render as their contents,
    /// `System.Guid` instances as canonical GUID text.
    pub fn value_text(&self, value: &Value) -> String {
        match value {
            Value::Primitive(p) => p.to_string(),
            Value::Null => "null".to_string(),
            Value::Reference(id) => format!("<unresolved #{id}>"),
            Value::Record(rid) => match self.record(*rid) {
                NrbfRecord::ObjectString(s) => s.value.clone(),
                NrbfRecord::Class(c) => match guid::guid_text(c) {
                    Some(text) => text,
                    None => format!("<{}>", c.info.name),
                },
                NrbfRecord::PrimitiveArray(a) => format!("<array[{}]>", a.length),
                NrbfRecord::ObjectArray(a) => format!("<array[{}]>", a.length),
                NrbfRecord::StringArray(a) => format!("<array[{}]>", a.length),
                NrbfRecord::BinaryArray(a) => format!("<array[{}]>", a.total_len()),
                NrbfRecord::PrimitiveTyped(p) => p.to_string(),
                NrbfRecord::Reference(id) => format!("<unresolved #{id}>"),
                NrbfRecord::Null => "null".to_string(),
                NrbfRecord::NullMultiple256(_) | NrbfRecord::NullMultiple(_) => "null".to_string(),
                NrbfRecord::Library(l) => format!("<library {}>", l.name),
            },
        }
    }

    /// Count records and values by kind.
    pub fn stats(&self) -> DocumentStats {
        let mut stats = DocumentStats {
            records: self.records.len(),
            classes: 0,
            strings: 0,
            arrays: 0,
            libraries: 0,
            references: 0,
            null_values: 0,
            primitive_values: 0,
        };
        for record in &self.records {
            let slots: &[Slot] = match record {
                NrbfRecord::Class(c) => {
                    stats.classes += 1;
                    &c.slots
                }
                NrbfRecord::ObjectString(_) => {
                    stats.strings += 1;
                    &[]
                }
                NrbfRecord::Library(_) => {
                    stats.libraries += 1;
                    &[]
                }
                NrbfRecord::PrimitiveArray(a) => {
                    stats.arrays += 1;
                    stats.primitive_values += a.values.len();
                    &[]
                }
                NrbfRecord::ObjectArray(a) => {
                    stats.arrays += 1;
                    &a.slots
                }
                NrbfRecord::StringArray(a) => {
                    stats.arrays += 1;
                    &a.slots
                }
                NrbfRecord::BinaryArray(a) => {
                    stats.arrays += 1;
                    &a.slots
                }
                NrbfRecord::Reference(_) => {
                    stats.references += 1;
                    &[]
                }
                NrbfRecord::PrimitiveTyped(_) => {
                    stats.primitive_values += 1;
                    &[]
                }
                NrbfRecord::Null => {
                    stats.null_values += 1;
                    &[]
                }
                NrbfRecord::NullMultiple256(count) => {
                    stats.null_values += usize::from(*count);
                    &[]
                }
                NrbfRecord::NullMultiple(count) => {
                    stats.null_values += (*count).max(0) as usize;
                    &[]
                }
            };
            for slot in slots {
                match slot {
                    Slot::Value(Value::Primitive(_)) => stats.primitive_values += 1,
                    Slot::Value(Value::Null) => stats.null_values += 1,
                    Slot::Value(Value::Reference(_)) => stats.references += 1,
                    Slot::NullRun { count, .. } => {
                        stats.null_values += (*count).max(0) as usize
                    }
                    _ => {}
                }
            }
        }
        stats
    }

    /// Lazy pre-order traversal yielding `(path, value)` for every
    /// member and element reachable from the root.
    ///
    /// Nested records are walked; references are yielded but not
    /// followed, so the sequence is finite even for cyclic graphs. A
    /// fresh call starts over from the root.
    pub fn iter(&self) -> PathIter<'_> {
        let mut iter = PathIter {
            doc: self,
            stack: Vec::new(),
            visited: HashSet::new(),
        };
        if let Some(id) = self.root_record().object_id() {
            iter.visited.insert(id);
        }
        iter.push_children("", self.root);
        iter
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("header", &self.header)
            .field("records", &self.records.len())
            .field("libraries", &self.libraries.len())
            .field("root", &self.root)
            .finish()
    }
}

/// Iterator behind [`Document::iter`].
pub struct PathIter<'a> {
    doc: &'a Document,
    stack: Vec<(String, Value)>,
    visited: HashSet<i32>,
}

impl PathIter<'_> {
    fn push_children(&mut self, prefix: &str, rid: RecordId) {
        let mut children: Vec<(String, Value)> = Vec::new();
        match self.doc.record(rid) {
            NrbfRecord::Class(class) => {
                for (name, value) in class.members() {
                    children.push((join_member(prefix, name), value));
                }
            }
            record => {
                if let Some(elements) = self.doc.array_elements(record) {
                    for (index, value) in elements.into_iter().enumerate() {
                        children.push((join_index(prefix, index), value));
                    }
                }
            }
        }
        for child in children.into_iter().rev() {
            self.stack.push(child);
        }
    }
}

impl Iterator for PathIter<'_> {
    type Item = (String, Value);

    fn next(&mut self) -> Option<Self::Item> {
        let (path, value) = self.stack.pop()?;
        match &value {
            Value::Record(rid) => {
                let fresh = match self.doc.record(*rid).object_id() {
                    Some(id) => self.visited.insert(id),
                    None => true,
                };
                if fresh {
                    self.push_children(&path, *rid);
                }
            }
            Value::Reference(id) => {
                if self.doc.lookup(*id).is_none() {
                    self.doc
                        .log(&format!("dangling reference to object id {id} at {path}"));
                }
            }
            _ => {}
        }
        Some((path, value))
    }
}

pub(crate) fn join_member(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

pub(crate) fn join_index(prefix: &str, index: usize) -> String {
    format!("{prefix}[{index}]")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::load;
    use crate::fixtures;
    use crate::record::Primitive;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_records_in_order_includes_libraries() {
        let doc = load(&fixtures::vec3_array()).unwrap();
        let tags: Vec<_> = doc.records_in_order().map(NrbfRecord::tag).collect();
        assert_eq!(tags.len(), 2); // library + the array; elements are nested
        assert_eq!(tags[0], crate::record::RecordTag::BinaryLibrary);
        assert_eq!(tags[1], crate::record::RecordTag::ArraySingleObject);
        assert_eq!(doc.library_name(50), Some("GameLib"));
    }

    #[test]
    fn test_resolve_dangling_reference() {
        let doc = load(&fixtures::single_int_class(1)).unwrap();
        let err = doc.resolve(&Value::Reference(404)).unwrap_err();
        assert!(matches!(err, NrbfError::DanglingReference(404)));
    }

    #[test]
    fn test_stats() {
        let doc = load(&fixtures::string_reference()).unwrap();
        let stats = doc.stats();
        assert_eq!(stats.classes, 1);
        assert_eq!(stats.strings, 1);
        assert_eq!(stats.references, 1);

        let doc = load(&fixtures::vec3_array()).unwrap();
        let stats = doc.stats();
        assert_eq!(stats.classes, 5);
        assert_eq!(stats.arrays, 1);
        assert_eq!(stats.libraries, 1);
        assert_eq!(stats.primitive_values, 15);
    }

    #[test]
    fn test_iter_yields_paths_in_preorder() {
        let doc = load(&fixtures::nested_player(1000)).unwrap();
        let paths: Vec<String> = doc.iter().map(|(path, _)| path).collect();
        assert_eq!(paths, vec!["Player", "Player.Stats", "Player.Stats.XP"]);

        let xp = doc
            .iter()
            .find(|(path, _)| path == "Player.Stats.XP")
            .map(|(_, value)| value)
            .unwrap();
        assert_eq!(xp, Value::Primitive(Primitive::Int32(1000)));
    }

    #[test]
    fn test_iter_is_finite_on_cycles() {
        let doc = load(&fixtures::self_cycle()).unwrap();
        // Member "Me" references the enclosing record; traversal must
        // terminate and yield the reference itself.
        let entries: Vec<(String, Value)> = doc.iter().collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, "Me");
        assert!(matches!(entries[0].1, Value::Reference(1)));
    }

    #[test]
    fn test_iter_array_paths() {
        let doc = load(&fixtures::int_primitive_array(&[7, 8])).unwrap();
        let entries: Vec<(String, Value)> = doc.iter().collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].0, "[0]");
        assert_eq!(entries[0].1, Value::Primitive(Primitive::Int32(7)));
        assert_eq!(entries[1].0, "[1]");
    }

    #[test]
    fn test_log_sink_sees_dangling_reference() {
        let mut doc = load(&fixtures::dangling_reference()).unwrap();
        let messages = Rc::new(RefCell::new(Vec::new()));
        let sink_messages = Rc::clone(&messages);
        doc.set_log_sink(move |msg| sink_messages.borrow_mut().push(msg.to_string()));

        // Traversal completes despite the dangling id and reports it.
        let entries: Vec<_> = doc.iter().collect();
        assert_eq!(entries.len(), 1);
        let logged = messages.borrow();
        assert_eq!(logged.len(), 1);
        assert!(logged[0].contains("404"));
    }

    #[test]
    fn test_debug_is_compact() {
        let doc = load(&fixtures::single_int_class(5)).unwrap();
        let text = format!("{doc:?}");
        assert!(text.contains("Document"));
        assert!(text.contains("records"));
    }
}
