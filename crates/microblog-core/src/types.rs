//! Domain records and the values exchanged with the search index.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::traits::{Indexable, Record};

/// Primary-store key. The index never invents its own ids.
pub type EntityId = u64;

/// Denormalized copy of the searchable fields, keyed by field name.
pub type IndexFields = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    User,
    Post,
}

impl EntityKind {
    pub const ALL: [EntityKind; 2] = [EntityKind::User, EntityKind::Post];

    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::User => "user",
            EntityKind::Post => "post",
        }
    }

    /// Kinds whose rows are mirrored into the search index.
    pub fn is_indexable(self) -> bool {
        match self {
            EntityKind::User => false,
            EntityKind::Post => true,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// (kind, id) pair naming a single row, and a single index entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: EntityId,
}

impl EntityRef {
    pub fn new(kind: EntityKind, id: EntityId) -> Self {
        Self { kind, id }
    }

    /// Unique index key, e.g. `post:42`.
    pub fn key(&self) -> String {
        format!("{}:{}", self.kind, self.id)
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// What gets written into the index for one row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDoc {
    pub entity: EntityRef,
    pub fields: IndexFields,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexOp {
    Upsert(IndexDoc),
    Remove(EntityRef),
}

impl IndexOp {
    pub fn entity(&self) -> EntityRef {
        match self {
            IndexOp::Upsert(doc) => doc.entity,
            IndexOp::Remove(entity) => *entity,
        }
    }
}

/// One page of ranked identifiers plus the total number of matches.
///
/// `ids` is in relevance order, best first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPage {
    pub ids: Vec<EntityId>,
    pub total: u64,
}

impl SearchPage {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0 || self.ids.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: EntityId,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub about_me: Option<String>,
    /// Ids of the users this user follows. Never contains the user's own id.
    #[serde(default)]
    pub followed: BTreeSet<EntityId>,
}

impl User {
    pub fn new(username: impl Into<String>, email: impl Into<String>) -> Self {
        Self { id: 0, username: username.into(), email: email.into(), about_me: None, followed: BTreeSet::new() }
    }

    pub fn is_following(&self, other: EntityId) -> bool {
        self.followed.contains(&other)
    }

    /// Returns `false` when `other` was already followed or is this user.
    pub fn follow(&mut self, other: EntityId) -> bool {
        other != self.id && self.followed.insert(other)
    }

    pub fn unfollow(&mut self, other: EntityId) -> bool {
        self.followed.remove(&other)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: EntityId,
    pub body: String,
    pub timestamp: DateTime<Utc>,
    pub user_id: EntityId,
    #[serde(default)]
    pub language: Option<String>,
}

impl Post {
    pub fn new(user_id: EntityId, body: impl Into<String>) -> Self {
        Self { id: 0, body: body.into(), timestamp: Utc::now(), user_id, language: None }
    }
}

/// Any row the unit of work can track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Entity {
    User(User),
    Post(Post),
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::User(_) => EntityKind::User,
            Entity::Post(_) => EntityKind::Post,
        }
    }

    pub fn id(&self) -> EntityId {
        match self {
            Entity::User(u) => u.id,
            Entity::Post(p) => p.id,
        }
    }

    pub fn entity_ref(&self) -> EntityRef {
        EntityRef::new(self.kind(), self.id())
    }

    /// Index entry for this row, or `None` when its kind is not indexable.
    ///
    /// Every kind that answers `true` to [`EntityKind::is_indexable`] must
    /// return `Some` here.
    pub fn index_doc(&self) -> Option<IndexDoc> {
        match self {
            Entity::User(_) => None,
            Entity::Post(p) => Some(p.index_doc()),
        }
    }
}

impl Record for User {
    const KIND: EntityKind = EntityKind::User;

    fn id(&self) -> EntityId { self.id }

    fn set_id(&mut self, id: EntityId) { self.id = id; }

    fn into_entity(self) -> Entity { Entity::User(self) }

    fn from_entity(entity: Entity) -> Option<Self> {
        match entity {
            Entity::User(u) => Some(u),
            _ => None,
        }
    }
}

impl Record for Post {
    const KIND: EntityKind = EntityKind::Post;

    fn id(&self) -> EntityId { self.id }

    fn set_id(&mut self, id: EntityId) { self.id = id; }

    fn into_entity(self) -> Entity { Entity::Post(self) }

    fn from_entity(entity: Entity) -> Option<Self> {
        match entity {
            Entity::Post(p) => Some(p),
            _ => None,
        }
    }
}

impl Indexable for Post {
    const SEARCHABLE: &'static [&'static str] = &["body"];

    fn field(&self, name: &str) -> Option<&str> {
        match name {
            "body" => Some(&self.body),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_doc_matches_indexable_kinds() {
        let user = Entity::User(User::new("susan", "susan@example.com"));
        let post = Entity::Post(Post::new(1, "hello there"));
        for entity in [user, post] {
            assert_eq!(entity.index_doc().is_some(), entity.kind().is_indexable(), "{}", entity.kind());
        }
    }

    #[test]
    fn post_index_doc_carries_body_only() {
        let mut post = Post::new(3, "my first post");
        post.id = 9;
        let doc = post.index_doc();
        assert_eq!(doc.entity, EntityRef::new(EntityKind::Post, 9));
        assert_eq!(doc.fields.len(), 1);
        assert_eq!(doc.fields.get("body").map(String::as_str), Some("my first post"));
    }

    #[test]
    fn follow_skips_self_and_duplicates() {
        let mut user = User::new("susan", "susan@example.com");
        user.id = 1;
        assert!(!user.follow(1));
        assert!(user.follow(2));
        assert!(!user.follow(2));
        assert!(user.is_following(2));
        assert!(user.unfollow(2));
        assert!(!user.unfollow(2));
        assert!(user.followed.is_empty());
    }

    #[test]
    fn entity_ref_key_is_kind_and_id() {
        assert_eq!(EntityRef::new(EntityKind::Post, 42).key(), "post:42");
    }
}
