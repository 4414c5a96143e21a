//! Content hierarchy repositories: collections, sub-collections, items, tags
//! and the ownership chains linking them to accounts.

pub mod collection;
pub mod hierarchy;
pub mod item;
pub mod ownership;
pub mod sub_collection;
pub mod tag;

pub use collection::{CollectionKind, CollectionRepository};
pub use hierarchy::{HierarchyKind, HierarchyRepository, NamedKind};
pub use item::{ItemKind, ItemRepository};
pub use ownership::{OwnershipChain, OwnershipLink, OwnershipRepository};
pub use sub_collection::{SubCollectionKind, SubCollectionRepository};
pub use tag::TagRepository;
