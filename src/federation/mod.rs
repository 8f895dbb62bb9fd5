//! ActivityPub federation module
//!
//! Handles:
//! - Activity document construction (actors, notes, creates)
//! - HTTP Signatures (outbound signing)
//! - Signed activity delivery
//! - The asynchronous delivery queue
//! - WebFinger

pub mod activity;
mod delivery;
mod queue;
mod signature;
mod webfinger;

pub use delivery::{DeliveryClient, DeliveryReceipt, unique_inbox_targets};
pub use queue::{DeliveryQueue, JobState};
pub use signature::{
    ParsedSignature, SignatureHeaders, generate_digest, parse_signature_header, sign_request,
};
pub use webfinger::{AcctResource, WebFingerResponse, generate_webfinger_response};
