pub mod client;
pub mod http;
pub mod schema_cache;
pub mod traits;

pub use client::*;
pub use http::*;
pub use schema_cache::*;
pub use traits::*;
