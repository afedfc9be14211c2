pub mod config;
pub mod error;
pub mod logic;
pub mod model;
pub mod store;

#[cfg(test)]
mod test_support;

// Export error types
pub use error::{DefaultClassifier, Error, ErrorClassifier, Result, ServerError};

// Export logic types
pub use logic::{Accessor, PageState, Query, QueryIter, QuerySpec, RecordType, TypeRegistry};

// Export all model types
pub use model::*;

// Export store types
pub use store::{
    AuthProvider, Client, HttpTransport, Method, RecordClass, Request, Response, SchemaRegistry,
    StaticAuth, Transport,
};
