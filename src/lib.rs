pub mod libs;

pub use libs::*;
