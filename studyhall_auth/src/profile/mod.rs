//! Profile records and the profile-table service

mod errors;
mod store;
mod types;

pub use errors::ProfileError;
pub use store::ProfileStore;
pub use types::{NewProfile, ProfileChanges, UserProfile};
