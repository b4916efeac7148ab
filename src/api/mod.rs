//! Backend API boundary
//!
//! Architecture follows the project pattern (trait + impl + mock):
//! - `ApiBackend` trait: async interface covering every `/api/*` call
//! - `HttpBackend`: real implementation over reqwest
//! - `MockBackend`: in-memory backend with scripted replies for tests

pub mod client;
pub mod error;
pub mod mock;
pub mod traits;
pub mod types;

pub use client::HttpBackend;
pub use error::{ApiError, CONNECTION_ERROR};
pub use mock::{Endpoint, MockBackend};
pub use traits::{ApiBackend, ApiResult};
pub use types::*;
