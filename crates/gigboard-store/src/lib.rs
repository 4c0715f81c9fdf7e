//! Firestore REST document store for the Gigboard collections.
//!
//! This crate provides:
//! - A thin Firestore REST client with bounded timeouts and retry
//! - Typed stores for job postings and accepted tasks
//! - Service account authentication via gcp_auth, or emulator mode for tests
//! - Storage-level uniqueness for the `(job_id, job_taker_email)` pair

pub mod client;
pub mod error;
pub mod jobs;
pub mod metrics;
pub mod retry;
pub mod tasks;
pub mod types;

pub use client::{StoreClient, StoreConfig};
pub use error::{StoreError, StoreResult};
pub use jobs::JobStore;
pub use tasks::{task_doc_id, AcceptedTaskStore, InsertOutcome};
pub use types::{Document, FromStoreValue, ToStoreValue, Value};
