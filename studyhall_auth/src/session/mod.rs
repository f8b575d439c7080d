//! Session service: sign-up/sign-in/sign-out and current-user resolution

mod errors;
mod service;
mod types;

pub use errors::SessionError;
pub use service::AuthService;
pub use types::{SignInData, SignUpData};
