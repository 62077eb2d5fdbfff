//! Listing reports filed by users and moderated by admins.

mod repo;
pub mod repo_types;

pub use repo_types::{Report, ReportStatus};
