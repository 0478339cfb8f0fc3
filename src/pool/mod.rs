//! AMM pool state decoding

pub mod decoder;

pub use decoder::{decode, PoolRawState, MAX_TOKEN_DECIMALS};
