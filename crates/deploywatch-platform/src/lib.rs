//! Client for the deployment-management platform.
//!
//! The platform's REST surface is an opaque collaborator: this crate owns
//! the typed view of its responses and the [`PlatformClient`] trait the
//! rest of the workspace programs against. Two implementations ship: a
//! `reqwest`-backed REST client and an in-memory fixture store for tests
//! and demos.

pub mod client;
pub mod types;

pub use client::{DynPlatformClient, MemoryPlatform, PlatformClient, PlatformConfig, RestPlatformClient};
pub use types::{Deployment, ServiceStats, TraceSpan, TraceSummary};
