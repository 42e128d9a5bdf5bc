//! microblog-store
//!
//! Primary row store for users and posts, with an explicit unit of work
//! ([`Session`]) whose commits can be observed through [`CommitHook`]s.

pub mod hooks;
pub mod session;
pub mod store;
mod table;

pub use hooks::{CommitHook, TxnId, TxnSlot};
pub use session::{CommitReport, HookFailure, Session, TrackedChanges};
pub use store::Store;
