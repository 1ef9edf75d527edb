//! Bounded record of recently touched objects.
//!
//! Rendered into contract-violation messages so that a failing pass can be
//! traced back to the nodes it was working on.

use crate::class::{ClassRegistry, Kind};
use crate::ids::{ClassTag, ObjectId};
use std::collections::VecDeque;
use std::fmt::Write;

/// Ring buffer of the most recent object identities allocated or mutated.
#[derive(Debug, Clone)]
pub struct TraceRing {
    depth: usize,
    entries: VecDeque<(ObjectId, ClassTag, Kind)>,
}

impl TraceRing {
    /// Creates a ring remembering at most `depth` entries.
    pub fn new(depth: usize) -> Self {
        Self {
            depth,
            entries: VecDeque::with_capacity(depth),
        }
    }

    /// Records an object, evicting the oldest entry when full. Consecutive
    /// touches of the same object are recorded once.
    pub fn record(&mut self, id: ObjectId, tag: ClassTag, kind: Kind) {
        if self.depth == 0 {
            return;
        }
        if let Some(last) = self.entries.back_mut() {
            if last.0 == id {
                *last = (id, tag, kind);
                return;
            }
        }
        if self.entries.len() == self.depth {
            self.entries.pop_front();
        }
        self.entries.push_back((id, tag, kind));
    }

    /// Returns the recorded objects, oldest first.
    pub fn objects(&self) -> Vec<ObjectId> {
        self.entries.iter().map(|(id, _, _)| *id).collect()
    }

    /// Renders the ring as `recent objects: T_REF@a0:3, ...`, newest last.
    pub fn render(&self, registry: &ClassRegistry) -> String {
        if self.entries.is_empty() {
            return String::new();
        }
        let mut out = String::from("recent objects:");
        for (i, (id, tag, kind)) in self.entries.iter().enumerate() {
            let name = registry
                .get(*tag)
                .map(|class| class.kind_name(*kind))
                .unwrap_or("?");
            let sep = if i == 0 { " " } else { ", " };
            let _ = write!(out, "{sep}{name}@{id}");
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::tests::{registry, NodeKind, NODE_TAG};
    use crate::ids::ArenaId;

    fn oid(index: u32) -> ObjectId {
        ObjectId::new(ArenaId::from_raw(0), index)
    }

    #[test]
    fn evicts_oldest() {
        let mut ring = TraceRing::new(2);
        ring.record(oid(1), NODE_TAG, 0);
        ring.record(oid(2), NODE_TAG, 0);
        ring.record(oid(3), NODE_TAG, 0);
        assert_eq!(ring.objects(), vec![oid(2), oid(3)]);
    }

    #[test]
    fn collapses_repeats() {
        let mut ring = TraceRing::new(4);
        ring.record(oid(1), NODE_TAG, 0);
        ring.record(oid(1), NODE_TAG, 1);
        assert_eq!(ring.objects(), vec![oid(1)]);
    }

    #[test]
    fn zero_depth_records_nothing() {
        let mut ring = TraceRing::new(0);
        ring.record(oid(1), NODE_TAG, 0);
        assert!(ring.objects().is_empty());
        assert_eq!(ring.render(&registry()), "");
    }

    #[test]
    fn render_names_kinds() {
        let mut ring = TraceRing::new(4);
        ring.record(oid(1), NODE_TAG, NodeKind::Decl.as_raw());
        ring.record(oid(2), NODE_TAG, NodeKind::Name.as_raw());
        assert_eq!(
            ring.render(&registry()),
            "recent objects: N_DECL@a0:1, N_NAME@a0:2"
        );
    }
}
