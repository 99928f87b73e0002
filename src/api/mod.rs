//! Remote finance API implementations
//!
//! - `http` - reqwest client speaking JSON to the real service
//! - `memory` - in-process stand-in holding accounts and identifiers

pub mod http;
pub mod memory;

pub use http::HttpApi;
pub use memory::InMemoryApi;
