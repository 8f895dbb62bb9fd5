//! Service layer
//!
//! Business logic between the HTTP surface and the data layer.

mod account;
mod post;

pub use account::AccountService;
pub use post::PostService;
