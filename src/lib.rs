//! A deterministic, concentrated-liquidity AMM pool engine: the tick math,
//! sqrt-price math, swap step math and bookkeeping tables behind a
//! Uniswap-V3-style pool, with no chain, RPC, or account model attached.
//!
//! The entry point is [`pool::PoolEngine`]; everything else is a building
//! block it composes.

pub mod bit_math;
pub mod error;
pub mod fixed_point;
pub mod liquidity_math;
pub mod oracle;
pub mod pool;
pub mod position;
pub mod snapshot;
pub mod sqrt_price_math;
pub mod swap_math;
pub mod tick;
pub mod tick_math;

pub use error::{PoolError, PoolResult};
pub use pool::{PoolEngine, PoolImmutables, PoolState, Slot0};
pub use snapshot::PoolSnapshot;
