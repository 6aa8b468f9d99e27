//! Shared types and result aliases for the persistence layer

pub mod errors;

pub use errors::ChatterError;

pub type ChatterResult<T> = Result<T, ChatterError>;
