//! Staff-only moderation endpoints under `/admin`.
//!
//! Every handler takes an [`AdminUser`](crate::api::user_management::models::AdminUser)
//! guard, so non-admins get a 403 before any query runs.

pub mod dashboard;
pub mod equipment;
pub mod payments;
pub mod rentals;
pub mod users;
