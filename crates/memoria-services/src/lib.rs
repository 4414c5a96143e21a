//! Memoria services
//!
//! Business logic on top of the repositories: ownership checks, the media
//! library, tag reconciliation, moderation and the account status gate.

pub mod account_gate;
pub mod accounts;
pub mod app;
pub mod authz;
pub mod geocoding;
pub mod library;
pub mod moderation;
pub mod password;
pub mod soft_delete;
pub mod tags;
pub mod telemetry;
pub mod upload;

pub use account_gate::AccountStatusGate;
pub use accounts::AccountService;
pub use app::{AccountSession, AdminSession, Memoria};
pub use authz::AuthorizationResolver;
pub use geocoding::{create_geocoder, DisabledGeocoder, Geocoder, NominatimGeocoder};
pub use library::{LibraryParts, LibraryService};
pub use moderation::ModerationEngine;
pub use password::{Argon2Verifier, PasswordVerifier};
pub use soft_delete::SoftDeleteEngine;
pub use tags::TagReconciler;
pub use telemetry::init_telemetry;
pub use upload::UploadService;
