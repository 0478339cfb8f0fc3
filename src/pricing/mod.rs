//! Price normalization across venues

pub mod normalizer;

pub use normalizer::normalize;
