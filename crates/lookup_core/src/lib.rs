//! # Lookup Core
//!
//! The shared machinery behind the reputation plugins. A lifecycle hook checks
//! the [`LookupCache`]; on a miss it hands a fetch closure to the
//! [`LookupPipeline`], which runs it as a background task. The task talks to
//! the remote API through an [`ApiClient`] and pushes every player's result
//! into a single completion channel. One consumer drains that channel, writes
//! the cache and then updates the host's player table through an
//! [`Annotator`].
//!
//! ```text
//! hook ──▶ cache hit? ──yes──▶ replay annotation
//!              │no
//!              ▼
//!        dispatch worker ──▶ ApiClient ──▶ DeliverySink
//!                                              │
//!                     consumer: cache.put ──▶ annotate ──▶ PlayerTable
//! ```
//!
//! Network failures never escape: a failed lookup is delivered as an empty
//! [`LookupRecord`], which the consumer drops without touching the cache.

pub mod annotation;
pub mod bootstrap;
pub mod cache;
pub mod client;
mod error;
pub mod pending;
pub mod pipeline;
pub mod record;

pub use annotation::{Annotation, TooltipBuilder};
pub use bootstrap::{AcceptNonEmpty, ApiKeyBootstrap, KeyState, KeyValidator};
pub use cache::LookupCache;
pub use client::{ApiClient, ClientConfig, RetryPolicy};
pub use error::LookupError;
pub use pending::PendingRequests;
pub use pipeline::{Annotator, Delivery, DeliverySink, LookupPipeline};
pub use record::{Category, LookupRecord};
