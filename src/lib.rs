//! Incremental-retrieval and optimistic-interaction core for the Tunefeed
//! music discovery client.
//!
//! Two kinds of paginated external content sit behind one state model:
//! cursor-paginated video results from the provider API ([`gateway`],
//! [`services::stream`], [`services::discovery`]) and the offset-paginated
//! social feed with optimistic like/comment mutations ([`store`],
//! [`services::feed`], [`services::interaction`]). Everything UI-facing
//! consumes these through the view models in [`services::view`].

pub mod config;
pub mod domain;
pub mod error;
pub mod gateway;
pub mod services;
pub mod store;

pub use config::{ApiKeyHandle, Settings};
pub use error::{CoreError, CoreResult};
