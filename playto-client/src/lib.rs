pub mod client;
#[cfg(any(test, feature = "fake"))]
pub mod fake;
mod record;

pub use client::{ApiClient, ApiError, Result};
