//! Runtime value model shared by the execution engine and the host
//! interface.

pub mod value;

pub use value::Value;
