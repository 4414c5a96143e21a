//! Database repositories for data access layer
//!
//! Repositories are organized into library/ (the collection hierarchy, items,
//! tags, ownership chains) and moderation/ (accounts, sessions, reports). They
//! carry no policy; authorization, quotas and cascades are decided by the
//! services that call them.
//
// Content hierarchy repositories
pub mod library;
//
// Account, session and report repositories
pub mod moderation;
//
// Database setup (pool + migrations)
pub mod setup;
//
// Unit of work
pub mod transaction;

pub use library::{
    CollectionRepository, HierarchyKind, HierarchyRepository, ItemRepository, NamedKind,
    OwnershipChain, OwnershipLink, OwnershipRepository, SubCollectionRepository, TagRepository,
};
pub use moderation::{AccountRepository, ReportRepository, SessionRepository};
pub use setup::{setup_database, MIGRATOR};
pub use transaction::{TransactionGuard, UnitOfWork};
