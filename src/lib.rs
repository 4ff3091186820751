//! Resilient Twitter/X posting client.
//!
//! Posts text with optional media through a chain of upload strategies,
//! falling back from the most capable path to the simplest until one
//! succeeds.
//!
//! ## Pieces
//!
//! - Credential validation: offline presence/shape checks, values masked
//!   everywhere they surface
//! - Connectivity precheck: DNS, TCP, and TLS probes that report without
//!   raising
//! - Upload strategy chain: chunked first, then single-request OAuth 1.0a,
//!   then single-request Bearer when configured
//! - Failure classification: every attempt recorded and aggregated into a
//!   diagnostic report when all strategies fail
//! - Doctor: deployment self-check for operators

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod config;
pub mod doctor;
pub mod error;
pub mod media;
pub mod oauth;
pub mod precheck;
pub mod report;
pub mod service;
pub mod strategy;
pub mod types;

pub use config::Config;
pub use error::{PostError, PostResult};
pub use media::{MediaAsset, MediaHandle};
pub use report::{AggregateFailure, UploadAttempt};
pub use service::{PostReceipt, PostService};
pub use strategy::{UploadChain, UploadStrategy};
