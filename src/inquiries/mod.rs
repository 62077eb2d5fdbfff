//! Buyer inquiries on listings and the user-to-user messages around them.

mod messages;
mod repo;
pub mod repo_types;

pub use repo_types::{Inquiry, InquiryStatus, Message};
