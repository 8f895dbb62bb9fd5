//! HTTP handlers
//!
//! - `activitypub`: actor and post documents
//! - `wellknown`: WebFinger discovery
//! - `pages`: minimal HTML surface (setup, login, feed)

mod activitypub;
mod pages;
mod wellknown;

pub use activitypub::activitypub_router;
pub use pages::pages_router;
pub use wellknown::wellknown_router;
