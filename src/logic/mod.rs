pub mod coerce;
pub mod factory;
pub mod query;
pub mod resolve;
pub mod throttle;

pub use coerce::*;
pub use factory::*;
pub use query::*;
pub use resolve::*;
pub use throttle::{fetch_in_batches, merge_slices};
