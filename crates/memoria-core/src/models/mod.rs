//! Domain models

pub mod account;
pub mod admin;
pub mod collection;
pub mod item;
pub mod report;
pub mod session;
pub mod tag;

pub use account::{
    Account, AccountRole, AccountSnapshot, AccountStatus, PasswordChangeRequest,
    ProfileUpdateRequest, SessionStatus, SignupRequest, DEFAULT_BLOCK_REASON, MAX_PENALTY_DAYS,
};
pub use admin::{AccountOverview, AdminStats, SubCollectionDetail};
pub use collection::{Collection, NameRequest, SubCollection, SubCollectionSummary};
pub use item::{
    Coordinates, Item, ItemMetaUpdate, ItemWithTags, LocationInput, MapLocation, MediaKind,
    NewItemMeta, ResolvedLocation, StoredPayload, ThumbnailRef,
};
pub use report::{CreateReportRequest, Report, ReportStatus, ReportView};
pub use session::Session;
pub use tag::Tag;
