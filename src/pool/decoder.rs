//! Uniswap V3 sqrt-price decoding
//!
//! A pool's `slot0` packs the spot price as `sqrtPriceX96 = sqrt(token1_raw /
//! token0_raw) * 2^96` (a Q64.96 fixed-point value in a `uint160`). Squaring
//! recovers the raw token1-per-token0 ratio; rescaling by the two tokens'
//! decimals turns it into a human-unit ratio. The squaring is done in 512-bit
//! integer arithmetic so the full `uint160 * uint160` product never truncates.

use ethers::types::{U256, U512};
use rust_decimal::Decimal;

use crate::errors::DecodeError;

/// Upper bound for on-chain token decimals accepted by the decoder
pub const MAX_TOKEN_DECIMALS: u8 = 36;

/// `sqrtPriceX96` carries a 2^96 scale; its square carries 2^192.
const SQRT_PRICE_SHIFT: usize = 192;

/// Fractional digits carried through the integer stage. 18 keeps well over
/// 8 significant digits even for sub-cent tokens.
const WORK_SCALE: u32 = 18;

/// Raw packed pool state plus the decimal precision of both tokens,
/// produced once per collection tick and consumed here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolRawState {
    pub sqrt_price_x96: U256,
    pub token0_decimals: u8,
    pub token1_decimals: u8,
}

/// Decode a packed sqrt price into the price of the traded token in units of
/// the quote stablecoin.
///
/// The squared ratio prices token0 in token1 units; when the quote stablecoin
/// is token0 the reciprocal is returned so the result is always quoted in the
/// stablecoin. Malformed state (zero packed value, decimals outside
/// `0..=36`, or an implausible decoded magnitude) fails with [`DecodeError`]
/// and the caller must skip the observation rather than record a zero price.
pub fn decode(raw: &PoolRawState, quote_is_token0: bool) -> Result<Decimal, DecodeError> {
    if raw.sqrt_price_x96.is_zero() {
        return Err(DecodeError::ZeroSqrtPrice);
    }
    for decimals in [raw.token0_decimals, raw.token1_decimals] {
        if decimals > MAX_TOKEN_DECIMALS {
            return Err(DecodeError::DecimalsOutOfRange(decimals));
        }
    }

    // ratio = sqrtPriceX96^2 / 2^192 * 10^(d0 - d1), scaled up by
    // 10^WORK_SCALE so the right shift keeps fractional digits.
    let squared: U512 = raw.sqrt_price_x96.full_mul(raw.sqrt_price_x96);
    let exp = i32::from(raw.token0_decimals) - i32::from(raw.token1_decimals) + WORK_SCALE as i32;
    let scaled = if exp >= 0 {
        (squared * pow10(exp as u32)) >> SQRT_PRICE_SHIFT
    } else {
        (squared / pow10(exp.unsigned_abs())) >> SQRT_PRICE_SHIFT
    };

    let ratio = to_decimal(scaled)?;
    let price = if quote_is_token0 {
        if ratio.is_zero() {
            return Err(DecodeError::PriceOutOfRange);
        }
        Decimal::ONE / ratio
    } else {
        ratio
    };

    check_plausible(price)?;
    Ok(price)
}

fn pow10(exp: u32) -> U512 {
    U512::from(10u64).pow(U512::from(exp))
}

/// Convert the work-scaled integer into a `Decimal` with `WORK_SCALE`
/// fractional digits. Values past the 96-bit mantissa are out of range.
fn to_decimal(scaled: U512) -> Result<Decimal, DecodeError> {
    if scaled > U512::from(i128::MAX as u128) {
        return Err(DecodeError::PriceOutOfRange);
    }
    Decimal::try_from_i128_with_scale(scaled.as_u128() as i128, WORK_SCALE)
        .map_err(|_| DecodeError::PriceOutOfRange)
}

/// Reject abnormal magnitudes instead of letting them flow downstream,
/// where a near-zero price would read as a huge arbitrage spread.
fn check_plausible(price: Decimal) -> Result<(), DecodeError> {
    let min = Decimal::new(1, 10); // 1e-10
    let max = Decimal::from(10_000_000_000u64); // 1e10
    if price < min || price > max {
        return Err(DecodeError::PriceOutOfRange);
    }
    Ok(())
}
