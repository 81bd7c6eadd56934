//! Domain services
//!
//! Each service takes the pool (and the view cache where it publishes or reads
//! derived views) explicitly; HTTP handlers are thin wrappers around them.

pub mod announcements;
pub mod conferences;
pub mod featured_speakers;
pub mod profiles;
pub mod query;
pub mod registration;
pub mod sessions;
pub mod wishlist;
