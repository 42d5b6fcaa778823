//! Error surface for the pool engine.
//!
//! Mirrors the declarative `#[error_code] enum ErrorCode { #[msg("...")] Variant }`
//! style of this crate's Anchor-program lineage, translated to `thiserror` now that
//! there is no on-chain program context to attach messages to.

use thiserror::Error;

/// Every way a pool operation can fail. Each variant that names an offending
/// value carries it for debugging, per the external interface contract.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("tick_lower {tick_lower} must be less than tick_upper {tick_upper}")]
    InvalidTickRange { tick_lower: i32, tick_upper: i32 },

    #[error("tick {tick} is not a multiple of tick_spacing {tick_spacing}")]
    TicksNotSpaced { tick: i32, tick_spacing: i32 },

    #[error("liquidity amount must be greater than zero")]
    ZeroLiquidity,

    #[error("liquidity_gross at tick {tick} would exceed max_liquidity_per_tick {max}")]
    LiquidityOverflow { tick: i32, max: u128 },

    #[error("amount_specified must be non-zero")]
    ZeroSwapAmount,

    #[error("sqrt_price_limit {sqrt_price_limit} is not between current price and the bound for zero_for_one={zero_for_one}")]
    InvalidPriceLimit {
        sqrt_price_limit: ethnum::U256,
        zero_for_one: bool,
    },

    #[error("sqrt_price_limit {sqrt_price_limit} is out of [MIN_SQRT_RATIO, MAX_SQRT_RATIO]")]
    PriceLimitOutOfBounds { sqrt_price_limit: ethnum::U256 },

    #[error("tick {tick} is outside [MIN_TICK, MAX_TICK]")]
    OutOfRangeTick { tick: i32 },

    #[error("sqrt_price {sqrt_price} is outside [MIN_SQRT_RATIO, MAX_SQRT_RATIO]")]
    OutOfRangeSqrtPrice { sqrt_price: ethnum::U256 },

    #[error("division by zero (divisor={divisor})")]
    DivByZero { divisor: ethnum::U256 },

    #[error("mul_div overflow: ({a} * {b}) / {d} exceeds the target width")]
    MulDivOverflow {
        a: ethnum::U256,
        b: ethnum::U256,
        d: ethnum::U256,
    },

    #[error("oracle observation requested at target older than the earliest initialized slot")]
    StaleOracle,

    #[error("attempted to poke an uninitialized position at ({owner}, {tick_lower}, {tick_upper})")]
    UninitializedPositionPoke {
        owner: String,
        tick_lower: i32,
        tick_upper: i32,
    },

    #[error("liquidity_gross at tick {tick} underflowed below zero")]
    UpdateUnderflow { tick: i32 },

    #[error("invalid pool snapshot: {reason}")]
    InvalidSnapshot { reason: String },
}

pub type PoolResult<T> = Result<T, PoolError>;
