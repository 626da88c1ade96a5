//! Account domain types and request payloads.

pub mod address;
pub mod user;

pub use address::{Address, CreateAddress, UpdateAddress};
pub use user::{ChangePassword, LoginRequest, RegisterRequest, UpdateProfile, User};
