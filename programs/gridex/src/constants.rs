/// Fixed-point scale of prices (quote per base) and geometric ratios.
pub const PRICE_SCALE: u64 = 1_000_000_000;

/// Grid fees are expressed in millionths of the quote notional.
pub const FEE_DENOMINATOR: u64 = 1_000_000;

/// Protocol share of a fee is expressed in basis points.
pub const BPS_DENOMINATOR: u64 = 10_000;

pub const DEFAULT_MIN_FEE_PPM: u32 = 10;
pub const DEFAULT_MAX_FEE_PPM: u32 = 100_000;
pub const DEFAULT_ONESHOT_FEE_PPM: u32 = 1_000;
pub const DEFAULT_PROTOCOL_FEE_SHARE_BPS: u16 = 2_500;
pub const DEFAULT_MAX_ORDERS_PER_SIDE: u32 = 512;

/// Bit layout of the packed external order handle (`u128`).
pub const ORDER_INDEX_BITS: u32 = 32;
pub const ORDER_RESERVED_BITS: u32 = 32;
pub const GRID_ID_SHIFT: u32 = ORDER_INDEX_BITS + ORDER_RESERVED_BITS;
