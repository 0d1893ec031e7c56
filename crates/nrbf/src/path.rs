//! Dotted-path lookup over the record graph.
//!
//! A path is `.`-joined segments of the form `name`, `name[i]`, or a
//! bare `[i]`. Each step follows at most one reference hop before
//! descending, and a miss at any step answers `None` rather than an
//! error: absent is an ordinary outcome for a lookup.

use crate::document::Document;
use crate::record::{NrbfRecord, RecordId, Value};

/// One resolved path step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step<'a> {
    Member(&'a str),
    Index(usize),
}

/// Where a path landed, precise enough for the edit API to write back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Target {
    ClassMember { rid: RecordId, member: usize },
    ArrayElement { rid: RecordId, index: usize },
}

pub(crate) struct Located {
    pub target: Target,
    /// The value exactly as stored in the slot, references unresolved.
    pub value: Value,
}

/// Split a path into steps. `None` on any syntax problem.
pub(crate) fn parse_path(path: &str) -> Option<Vec<Step<'_>>> {
    if path.is_empty() {
        return None;
    }
    let mut steps = Vec::new();
    for part in path.split('.') {
        if part.is_empty() {
            return None;
        }
        let (name, mut rest) = match part.find('[') {
            Some(pos) => (&part[..pos], &part[pos..]),
            None => (part, ""),
        };
        if !name.is_empty() {
            steps.push(Step::Member(name));
        }
        while !rest.is_empty() {
            if !rest.starts_with('[') {
                return None;
            }
            let close = rest.find(']')?;
            let index: usize = rest[1..close].parse().ok()?;
            steps.push(Step::Index(index));
            rest = &rest[close + 1..];
        }
    }
    if steps.is_empty() {
        None
    } else {
        Some(steps)
    }
}

/// Walk a path from the root. Returns the final slot location and its
/// stored value, or `None` when any step misses.
pub(crate) fn locate(doc: &Document, path: &str) -> Option<Located> {
    let steps = parse_path(path)?;
    let mut current = Value::Record(doc.root());
    let mut target = None;

    for step in steps {
        let record_id = match doc.resolve(&current) {
            Ok(Value::Record(rid)) => rid,
            Ok(_) => return None,
            Err(_) => {
                doc.log(&format!("dangling reference while walking {path}"));
                return None;
            }
        };
        match step {
            Step::Member(name) => {
                let class = match doc.record(record_id) {
                    NrbfRecord::Class(class) => class,
                    _ => return None,
                };
                let member = class.member_index(name)?;
                current = class.member_value(name)?;
                target = Some(Target::ClassMember {
                    rid: record_id,
                    member,
                });
            }
            Step::Index(index) => {
                let elements = doc.array_elements(doc.record(record_id))?;
                current = elements.get(index)?.clone();
                target = Some(Target::ArrayElement {
                    rid: record_id,
                    index,
                });
            }
        }
    }

    Some(Located {
        target: target?,
        value: current,
    })
}

impl Document {
    /// Look up the value at a path, following references transparently.
    ///
    /// A trailing reference is resolved one hop, so a path naming a
    /// referenced string answers the string record, not the reference.
    /// `None` means the path does not resolve; that is not an error.
    pub fn get(&self, path: &str) -> Option<Value> {
        let located = locate(self, path)?;
        match self.resolve(&located.value) {
            Ok(value) => Some(value),
            Err(_) => {
                self.log(&format!("dangling reference at {path}"));
                Some(located.value)
            }
        }
    }
}
