//! Accounts, sessions and reports.

pub mod account;
pub mod report;
pub mod session;

pub use account::AccountRepository;
pub use report::ReportRepository;
pub use session::SessionRepository;
