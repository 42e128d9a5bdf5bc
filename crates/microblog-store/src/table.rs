use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use microblog_core::error::{Error, Result};
use microblog_core::types::{Entity, EntityId, EntityKind, EntityRef};

use crate::session::TrackedChanges;

/// Committed rows, one ordered map per kind.
#[derive(Debug, Clone, Default)]
pub(crate) struct Tables {
	rows: BTreeMap<EntityKind, BTreeMap<EntityId, Entity>>,
	next_ids: BTreeMap<EntityKind, EntityId>,
}

/// On-disk form of [`Tables`].
#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct Snapshot {
	next_ids: BTreeMap<EntityKind, EntityId>,
	rows: Vec<Entity>,
}

impl Tables {
	pub(crate) fn table(&self, kind: EntityKind) -> Option<&BTreeMap<EntityId, Entity>> { self.rows.get(&kind) }

	pub(crate) fn get(&self, entity: EntityRef) -> Option<&Entity> { self.rows.get(&entity.kind).and_then(|t| t.get(&entity.id)) }

	pub(crate) fn contains(&self, entity: EntityRef) -> bool { self.get(entity).is_some() }

	pub(crate) fn len(&self, kind: EntityKind) -> usize { self.rows.get(&kind).map_or(0, BTreeMap::len) }

	/// Ids start at 1 and are never reused, even when the transaction that took one rolls back.
	pub(crate) fn allocate_id(&mut self, kind: EntityKind) -> EntityId {
		let next = self.next_ids.entry(kind).or_insert(1);
		let id = *next; *next = next.saturating_add(1); id
	}

	/// Inserts, then updates, then deletes. A row added and deleted by the same
	/// transaction therefore ends up absent.
	pub(crate) fn apply(&mut self, changes: &TrackedChanges) -> Result<()> {
		for entity in &changes.new {
			let entity_ref = entity.entity_ref();
			if self.contains(entity_ref) { return Err(Error::Store(format!("{entity_ref} already exists"))); }
			self.rows.entry(entity.kind()).or_default().insert(entity.id(), entity.clone());
		}
		for entity in &changes.dirty {
			let slot = self.rows.get_mut(&entity.kind()).and_then(|t| t.get_mut(&entity.id()));
			match slot {
				Some(row) => *row = entity.clone(),
				None => return Err(Error::NotFound(entity.entity_ref().to_string())),
			}
		}
		for entity in &changes.deleted {
			let removed = self.rows.get_mut(&entity.kind()).and_then(|t| t.remove(&entity.id()));
			if removed.is_none() { return Err(Error::NotFound(entity.entity_ref().to_string())); }
		}
		Ok(())
	}

	pub(crate) fn to_snapshot(&self) -> Snapshot {
		Snapshot { next_ids: self.next_ids.clone(), rows: self.rows.values().flat_map(|t| t.values().cloned()).collect() }
	}

	pub(crate) fn from_snapshot(snapshot: Snapshot) -> Result<Self> {
		let mut tables = Tables { next_ids: snapshot.next_ids, ..Tables::default() };
		for entity in snapshot.rows {
			let entity_ref = entity.entity_ref();
			let after = entity.id().checked_add(1).ok_or_else(|| Error::Store(format!("{entity_ref} exhausts the id space")))?;
			let next = tables.next_ids.entry(entity.kind()).or_insert(1);
			if *next < after { *next = after; }
			tables.rows.entry(entity.kind()).or_default().insert(entity.id(), entity);
		}
		Ok(tables)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use microblog_core::types::Post;

	fn post(id: EntityId, body: &str) -> Entity {
		let mut p = Post::new(1, body);
		p.id = id;
		Entity::Post(p)
	}

	#[test]
	fn add_then_delete_in_one_batch_leaves_no_row() {
		let mut tables = Tables::default();
		let changes = TrackedChanges { new: vec![post(1, "gone")], dirty: vec![], deleted: vec![post(1, "gone")] };
		tables.apply(&changes).expect("apply");
		assert_eq!(tables.len(EntityKind::Post), 0);
	}

	#[test]
	fn update_of_missing_row_fails() {
		let mut tables = Tables::default();
		let changes = TrackedChanges { new: vec![], dirty: vec![post(3, "x")], deleted: vec![] };
		assert!(matches!(tables.apply(&changes), Err(Error::NotFound(_))));
	}

	#[test]
	fn snapshot_restores_id_counter_past_existing_rows() {
		let mut tables = Tables::default();
		let changes = TrackedChanges { new: vec![post(4, "a")], dirty: vec![], deleted: vec![] };
		tables.apply(&changes).expect("apply");
		let snapshot = Snapshot { next_ids: BTreeMap::new(), rows: tables.to_snapshot().rows };
		let mut restored = Tables::from_snapshot(snapshot).expect("restore");
		assert_eq!(restored.allocate_id(EntityKind::Post), 5);
		assert_eq!(restored.allocate_id(EntityKind::User), 1);
	}

	#[test]
	fn snapshot_with_max_id_is_rejected() {
		let snapshot = Snapshot { next_ids: BTreeMap::new(), rows: vec![post(EntityId::MAX, "edge")] };
		assert!(matches!(Tables::from_snapshot(snapshot), Err(Error::Store(_))));
	}
}
