//! Input series for the pipeline.

pub mod sample;

pub use sample::*;
