pub mod error;
pub mod flow;

pub use error::{Error, Result};
pub use flow::{BipartiteGraph, FlowNetwork};
