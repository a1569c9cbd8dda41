pub mod env;
pub mod host;
pub mod memory;
pub mod runtime_error;
pub mod vm;

pub use host::HostApi;
pub use runtime_error::RuntimeError;
pub use vm::Vm;
