pub mod common;
pub mod page;
pub mod record;
pub mod schema;

pub use common::*;
pub use page::*;
pub use record::*;
pub use schema::*;
