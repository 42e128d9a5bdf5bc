use parking_lot::{Mutex, MutexGuard, RwLock};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

use microblog_core::error::{Error, Result};
use microblog_core::traits::{check_page, Record, RowStore};
use microblog_core::types::{Entity, EntityId, EntityKind, EntityRef, Post, User};

use crate::hooks::CommitHook;
use crate::session::{Session, TrackedChanges};
use crate::table::{Snapshot, Tables};

/// Primary row store. Optionally mirrors every commit to a JSON snapshot file.
pub struct Store {
    tables: RwLock<Tables>,
    path: Option<PathBuf>,
    hooks: RwLock<Vec<Arc<dyn CommitHook>>>,
    next_txn: AtomicU64,
    commit_gate: Mutex<()>,
}

impl Store {
    pub fn in_memory() -> Self {
        Self::with_tables(Tables::default(), None)
    }

    /// Load the snapshot at `path`, or start empty when it does not exist yet.
    pub fn open(path: &Path) -> Result<Self> {
        let tables = if path.exists() {
            let snapshot: Snapshot = serde_json::from_slice(&std::fs::read(path)?)?;
            Tables::from_snapshot(snapshot)?
        } else {
            Tables::default()
        };
        info!(path = %path.display(), users = tables.len(EntityKind::User), posts = tables.len(EntityKind::Post), "opened store");
        Ok(Self::with_tables(tables, Some(path.to_path_buf())))
    }

    fn with_tables(tables: Tables, path: Option<PathBuf>) -> Self {
        Self { tables: RwLock::new(tables), path, hooks: RwLock::new(Vec::new()), next_txn: AtomicU64::new(1), commit_gate: Mutex::new(()) }
    }

    /// Hooks registered here run for every session begun afterwards.
    pub fn register_hook(&self, hook: Arc<dyn CommitHook>) {
        debug!(hook = hook.name(), "registered commit hook");
        self.hooks.write().push(hook);
    }

    pub fn begin(&self) -> Session<'_> {
        let txn = self.next_txn.fetch_add(1, Ordering::Relaxed);
        Session::new(self, txn, self.hooks.read().clone())
    }

    pub fn get<E: Record>(&self, id: EntityId) -> Option<E> {
        self.get_entity(EntityRef::new(E::KIND, id)).and_then(E::from_entity)
    }

    pub fn count(&self, kind: EntityKind) -> usize {
        self.tables.read().len(kind)
    }

    pub fn find_user(&self, username: &str) -> Option<User> {
        let tables = self.tables.read();
        let user = tables.table(EntityKind::User)?.values().find_map(|e| match e {
            Entity::User(u) if u.username == username => Some(u.clone()),
            _ => None,
        });
        user
    }

    /// Posts written by `user_id`, newest first.
    pub fn posts_by_user(&self, user_id: EntityId) -> Vec<Post> {
        let mut posts: Vec<Post> = self.scan_posts().into_iter().filter(|p| p.user_id == user_id).collect();
        posts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        posts
    }

    /// One page of the global timeline, newest first, plus the total post count.
    pub fn recent_posts(&self, page: usize, per_page: usize) -> Result<(Vec<Post>, u64)> {
        check_page(page, per_page)?;
        Ok(newest_first_page(self.scan_posts(), page, per_page))
    }

    /// Home feed of `user_id`: their own posts and those of everyone they
    /// follow, newest first, plus the feed's total size.
    pub fn followed_posts(&self, user_id: EntityId, page: usize, per_page: usize) -> Result<(Vec<Post>, u64)> {
        check_page(page, per_page)?;
        let user = self
            .get::<User>(user_id)
            .ok_or_else(|| Error::NotFound(EntityRef::new(EntityKind::User, user_id).to_string()))?;
        let posts = self.scan_posts().into_iter().filter(|p| p.user_id == user_id || user.is_following(p.user_id)).collect();
        Ok(newest_first_page(posts, page, per_page))
    }

    fn scan_posts(&self) -> Vec<Post> {
        let tables = self.tables.read();
        tables
            .table(EntityKind::Post)
            .map(|t| t.values().cloned().filter_map(Post::from_entity).collect())
            .unwrap_or_default()
    }

    /// Held from the first hook's `before_commit` to the last `after_commit`,
    /// so hooks observe commits in the order the rows landed. Hooks must not
    /// commit on this store themselves.
    pub(crate) fn commit_gate(&self) -> MutexGuard<'_, ()> {
        self.commit_gate.lock()
    }

    pub(crate) fn allocate_id(&self, kind: EntityKind) -> EntityId {
        self.tables.write().allocate_id(kind)
    }

    pub(crate) fn contains(&self, entity: EntityRef) -> bool {
        self.tables.read().contains(entity)
    }

    pub(crate) fn get_entity(&self, entity: EntityRef) -> Option<Entity> {
        self.tables.read().get(entity).cloned()
    }

    /// Apply and persist `changes` as one step: either every row lands or none do.
    pub(crate) fn apply(&self, changes: &TrackedChanges) -> Result<()> {
        let mut tables = self.tables.write();
        let mut next = tables.clone();
        next.apply(changes)?;
        if let Some(path) = &self.path {
            write_snapshot(path, &next.to_snapshot())?;
        }
        *tables = next;
        Ok(())
    }
}

fn newest_first_page(mut posts: Vec<Post>, page: usize, per_page: usize) -> (Vec<Post>, u64) {
    let total = posts.len() as u64;
    posts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
    let items = posts.into_iter().skip((page - 1).saturating_mul(per_page)).take(per_page).collect();
    (items, total)
}

fn write_snapshot(path: &Path, snapshot: &Snapshot) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;
    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(&mut file, snapshot)?;
    file.flush()?;
    file.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

impl RowStore for Store {
    /// Rows come back in ascending id order, not in the order of `ids`.
    fn fetch_by_ids<E: Record>(&self, ids: &[EntityId]) -> Result<Vec<E>> {
        let mut wanted = ids.to_vec();
        wanted.sort_unstable();
        wanted.dedup();
        let tables = self.tables.read();
        let Some(table) = tables.table(E::KIND) else { return Ok(Vec::new()) };
        Ok(wanted.iter().filter_map(|id| table.get(id)).cloned().filter_map(E::from_entity).collect())
    }

    fn scan<E: Record>(&self) -> Result<Vec<E>> {
        let tables = self.tables.read();
        Ok(tables
            .table(E::KIND)
            .map(|t| t.values().cloned().filter_map(E::from_entity).collect())
            .unwrap_or_default())
    }
}
