use std::sync::Arc;
use tracing::{debug, error, warn};

use microblog_core::error::{Error, Result};
use microblog_core::traits::Record;
use microblog_core::types::{Entity, EntityId, EntityRef, User};

use crate::hooks::{CommitHook, TxnId, TxnSlot};
use crate::store::Store;

/// Objects a session has touched, grouped the way commit hooks see them.
///
/// A record added and then deleted in the same session appears in both
/// `new` and `deleted`; consumers that care must reconcile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackedChanges {
    pub new: Vec<Entity>,
    pub dirty: Vec<Entity>,
    pub deleted: Vec<Entity>,
}

impl TrackedChanges {
    pub fn is_empty(&self) -> bool {
        self.new.is_empty() && self.dirty.is_empty() && self.deleted.is_empty()
    }

    fn position(list: &[Entity], entity: EntityRef) -> Option<usize> {
        list.iter().position(|e| e.entity_ref() == entity)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookFailure {
    pub hook: String,
    pub error: String,
}

/// Outcome of a successful commit. The rows are committed even when
/// `hook_failures` is non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitReport {
    pub txn: TxnId,
    pub added: usize,
    pub updated: usize,
    pub deleted: usize,
    pub hook_failures: Vec<HookFailure>,
}

impl CommitReport {
    pub fn is_clean(&self) -> bool {
        self.hook_failures.is_empty()
    }
}

/// Unit of work over a [`Store`]. Nothing is visible to other sessions until
/// [`Session::commit`]; dropping the session discards its changes.
pub struct Session<'s> {
    store: &'s Store,
    txn: TxnId,
    changes: TrackedChanges,
    hooks: Vec<Arc<dyn CommitHook>>,
}

impl<'s> Session<'s> {
    pub(crate) fn new(store: &'s Store, txn: TxnId, hooks: Vec<Arc<dyn CommitHook>>) -> Self {
        Self { store, txn, changes: TrackedChanges::default(), hooks }
    }

    pub fn txn(&self) -> TxnId {
        self.txn
    }

    pub fn tracked(&self) -> &TrackedChanges {
        &self.changes
    }

    /// Track a new record and return the id assigned to it.
    pub fn add<E: Record>(&mut self, mut record: E) -> EntityId {
        let id = self.store.allocate_id(E::KIND);
        record.set_id(id);
        self.changes.new.push(record.into_entity());
        id
    }

    /// Track a modification. Updating a record added in this session rewrites
    /// the pending insert instead.
    pub fn update<E: Record>(&mut self, record: E) -> Result<()> {
        let entity_ref = record.entity_ref();
        let entity = record.into_entity();
        if TrackedChanges::position(&self.changes.deleted, entity_ref).is_some() {
            return Err(Error::NotFound(entity_ref.to_string()));
        }
        if let Some(i) = TrackedChanges::position(&self.changes.new, entity_ref) {
            self.changes.new[i] = entity;
            return Ok(());
        }
        if !self.store.contains(entity_ref) {
            return Err(Error::NotFound(entity_ref.to_string()));
        }
        match TrackedChanges::position(&self.changes.dirty, entity_ref) {
            Some(i) => self.changes.dirty[i] = entity,
            None => self.changes.dirty.push(entity),
        }
        Ok(())
    }

    /// Track a deletion. Deleting twice is a no-op.
    pub fn delete<E: Record>(&mut self, id: EntityId) -> Result<()> {
        let entity_ref = EntityRef::new(E::KIND, id);
        if TrackedChanges::position(&self.changes.deleted, entity_ref).is_some() {
            return Ok(());
        }
        let current = match TrackedChanges::position(&self.changes.dirty, entity_ref) {
            Some(i) => Some(self.changes.dirty.remove(i)),
            None => TrackedChanges::position(&self.changes.new, entity_ref)
                .map(|i| self.changes.new[i].clone())
                .or_else(|| self.store.get_entity(entity_ref)),
        };
        let entity = current.ok_or_else(|| Error::NotFound(entity_ref.to_string()))?;
        self.changes.deleted.push(entity);
        Ok(())
    }

    /// Read through this session's pending writes, then the committed rows.
    pub fn get<E: Record>(&self, id: EntityId) -> Option<E> {
        let entity_ref = EntityRef::new(E::KIND, id);
        if TrackedChanges::position(&self.changes.deleted, entity_ref).is_some() {
            return None;
        }
        let pending = TrackedChanges::position(&self.changes.dirty, entity_ref)
            .map(|i| &self.changes.dirty[i])
            .or_else(|| TrackedChanges::position(&self.changes.new, entity_ref).map(|i| &self.changes.new[i]));
        match pending {
            Some(entity) => E::from_entity(entity.clone()),
            None => self.store.get(id),
        }
    }

    /// Make `follower` follow `followed`. Returns `false` when it already did.
    pub fn follow(&mut self, follower: EntityId, followed: EntityId) -> Result<bool> {
        if follower == followed {
            return Err(Error::InvalidOperation("a user cannot follow themselves".into()));
        }
        self.get::<User>(followed).ok_or_else(|| Error::NotFound(EntityRef::new(User::KIND, followed).to_string()))?;
        self.change_follows(follower, |user| user.follow(followed))
    }

    /// Returns `false` when `follower` was not following `followed`.
    pub fn unfollow(&mut self, follower: EntityId, followed: EntityId) -> Result<bool> {
        self.change_follows(follower, |user| user.unfollow(followed))
    }

    fn change_follows(&mut self, follower: EntityId, change: impl FnOnce(&mut User) -> bool) -> Result<bool> {
        let mut user = self
            .get::<User>(follower)
            .ok_or_else(|| Error::NotFound(EntityRef::new(User::KIND, follower).to_string()))?;
        if !change(&mut user) {
            return Ok(false);
        }
        self.update(user)?;
        Ok(true)
    }

    pub fn commit(mut self) -> Result<CommitReport> {
        let changes = std::mem::take(&mut self.changes);
        let hooks = std::mem::take(&mut self.hooks);
        let mut slots: Vec<TxnSlot> = hooks.iter().map(|_| TxnSlot::default()).collect();
        let _gate = self.store.commit_gate();

        for (hook, slot) in hooks.iter().zip(slots.iter_mut()) {
            if let Err(e) = hook.before_commit(self.txn, &changes, slot) {
                warn!(txn = self.txn, hook = hook.name(), error = %e, "pre-commit hook failed; committing without it");
                slot.clear();
            }
        }

        if let Err(e) = self.store.apply(&changes) {
            for (hook, slot) in hooks.iter().zip(slots.iter_mut()) {
                hook.after_rollback(self.txn, slot);
                slot.clear();
            }
            debug!(txn = self.txn, error = %e, "commit rejected");
            return Err(e);
        }

        let mut report = CommitReport {
            txn: self.txn,
            added: changes.new.len(),
            updated: changes.dirty.len(),
            deleted: changes.deleted.len(),
            hook_failures: Vec::new(),
        };
        for (hook, slot) in hooks.iter().zip(slots.iter_mut()) {
            if let Err(e) = hook.after_commit(self.txn, slot) {
                error!(txn = self.txn, hook = hook.name(), error = %e, "post-commit hook failed");
                report.hook_failures.push(HookFailure { hook: hook.name().to_string(), error: e.to_string() });
            }
            slot.clear();
        }
        debug!(txn = self.txn, added = report.added, updated = report.updated, deleted = report.deleted, "committed");
        Ok(report)
    }

    pub fn rollback(mut self) {
        self.discard();
    }

    fn discard(&mut self) {
        if !self.changes.is_empty() {
            debug!(txn = self.txn, "discarding uncommitted changes");
        }
        self.changes = TrackedChanges::default();
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        self.discard();
    }
}
