pub mod runner;
pub mod types;

pub use runner::*;
pub use types::*;
