//! Shared data models for the Gigboard backend.
//!
//! This crate provides:
//! - Job posting and accepted task documents
//! - Id newtypes for both collections
//! - Sort order parsing for listing endpoints

pub mod job;
pub mod sort;
pub mod task;

pub use job::{JobId, JobPosting, JobPostingUpdate};
pub use sort::SortOrder;
pub use task::{AcceptedTask, TaskId};
