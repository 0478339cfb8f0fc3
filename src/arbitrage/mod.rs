//! Cross-venue spread detection

pub mod scorer;

pub use scorer::score;
