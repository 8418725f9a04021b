//! Compute module - Stochastic operators and the generation pipeline.

mod archive;
mod bucket;
mod crossover;
mod fitness;
mod genome;
mod janitor;
mod mutation;
mod pipeline;
mod report;
mod selection;

pub use archive::*;
pub use bucket::*;
pub use crossover::*;
pub use fitness::*;
pub use genome::*;
pub use janitor::*;
pub use mutation::*;
pub use pipeline::*;
pub use report::*;
pub use selection::*;
