//! Bearer credential model and the coalescing token cache.

pub mod cache;
pub mod credential;
pub mod secret;

pub use cache::*;
pub use credential::*;
pub use secret::*;
