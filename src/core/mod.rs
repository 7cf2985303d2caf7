// Core ranking pipeline, free of I/O
pub mod cohort;
pub mod collaborative;
pub mod diversity;
pub mod engine;
pub mod explain;
pub mod filters;
pub mod scoring;
pub mod similarity;

pub use engine::MatchEngine;
pub use explain::MatchStrategy;
