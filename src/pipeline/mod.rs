pub mod extraction;
pub mod validate;
pub mod processor;

pub use validate::*;
pub use processor::*;
