use std::collections::{HashMap, HashSet};

use microblog_core::types::{EntityRef, IndexDoc, IndexOp};
use microblog_store::TrackedChanges;

/// Index-relevant slice of one transaction, captured just before it commits.
///
/// Only indexable records are kept. A record that also appears in `delete` is
/// dropped from `add` and `update`, so a row created and deleted inside one
/// transaction is never indexed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingChangeSet {
    pub add: Vec<IndexDoc>,
    pub update: Vec<IndexDoc>,
    pub delete: Vec<EntityRef>,
}

impl PendingChangeSet {
    pub fn capture(changes: &TrackedChanges) -> Self {
        let delete: Vec<EntityRef> = changes
            .deleted
            .iter()
            .filter(|e| e.kind().is_indexable())
            .map(|e| e.entity_ref())
            .collect();
        let doomed: HashSet<EntityRef> = delete.iter().copied().collect();
        let keep = |doc: &IndexDoc| !doomed.contains(&doc.entity);
        Self {
            add: changes.new.iter().filter_map(|e| e.index_doc()).filter(keep).collect(),
            update: changes.dirty.iter().filter_map(|e| e.index_doc()).filter(keep).collect(),
            delete,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.update.is_empty() && self.delete.is_empty()
    }

    /// Index writes in replay order: upserts first, one per entity with the
    /// last captured value winning, then removes.
    pub fn into_ops(self) -> Vec<IndexOp> {
        let mut ops: Vec<IndexOp> = Vec::with_capacity(self.add.len() + self.update.len() + self.delete.len());
        let mut seen: HashMap<EntityRef, usize> = HashMap::new();
        for doc in self.add.into_iter().chain(self.update) {
            match seen.get(&doc.entity) {
                Some(&i) => ops[i] = IndexOp::Upsert(doc),
                None => {
                    seen.insert(doc.entity, ops.len());
                    ops.push(IndexOp::Upsert(doc));
                }
            }
        }
        let mut removed = HashSet::new();
        ops.extend(self.delete.into_iter().filter(|e| removed.insert(*e)).map(IndexOp::Remove));
        ops
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use microblog_core::types::{Entity, EntityKind, Post, User};

    fn post(id: u64, body: &str) -> Entity {
        let mut p = Post::new(1, body);
        p.id = id;
        Entity::Post(p)
    }

    fn user(id: u64) -> Entity {
        let mut u = User::new(format!("u{id}"), format!("u{id}@example.com"));
        u.id = id;
        Entity::User(u)
    }

    #[test]
    fn capture_skips_non_indexable_records() {
        let changes = TrackedChanges { new: vec![user(1), post(1, "a")], dirty: vec![user(2)], deleted: vec![user(3)] };
        let set = PendingChangeSet::capture(&changes);
        assert_eq!(set.add.len(), 1);
        assert_eq!(set.add[0].entity, EntityRef::new(EntityKind::Post, 1));
        assert!(set.update.is_empty());
        assert!(set.delete.is_empty());
    }

    #[test]
    fn created_and_deleted_in_one_transaction_is_only_deleted() {
        let changes = TrackedChanges { new: vec![post(4, "brief")], dirty: vec![], deleted: vec![post(4, "brief")] };
        let set = PendingChangeSet::capture(&changes);
        assert!(set.add.is_empty());
        assert_eq!(set.delete, vec![EntityRef::new(EntityKind::Post, 4)]);
        assert_eq!(set.into_ops(), vec![IndexOp::Remove(EntityRef::new(EntityKind::Post, 4))]);
    }

    #[test]
    fn later_upserts_win() {
        let changes = TrackedChanges { new: vec![post(1, "old"), post(2, "other")], dirty: vec![post(1, "new")], deleted: vec![] };
        let ops = PendingChangeSet::capture(&changes).into_ops();
        assert_eq!(ops.len(), 2);
        match &ops[0] {
            IndexOp::Upsert(doc) => assert_eq!(doc.fields.get("body").map(String::as_str), Some("new")),
            other => panic!("unexpected op {other:?}"),
        }
        assert_eq!(ops[1].entity(), EntityRef::new(EntityKind::Post, 2));
    }
}
