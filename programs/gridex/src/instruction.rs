use borsh::{BorshDeserialize, BorshSerialize};

use crate::error::{GridError, Result};
use crate::state::{Address, AssetId, OrderId};

/// Parameters of the linear strategy: `price(i) = price0 + i * gap`.
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct LinearParams {
    pub price0: u64,
    /// Positive for asks, negative for bids.
    pub gap: i64,
}

/// Parameters of the geometric strategy: `price(i) = price0 * ratio^i`.
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct GeometricParams {
    pub price0: u64,
    /// Scaled by `PRICE_SCALE`; above parity for asks, below for bids.
    pub ratio: u64,
}

impl LinearParams {
    pub fn encode(&self) -> Result<Vec<u8>> {
        borsh::to_vec(self).map_err(|_| GridError::InvalidParams)
    }
}

impl GeometricParams {
    pub fn encode(&self) -> Result<Vec<u8>> {
        borsh::to_vec(self).map_err(|_| GridError::InvalidParams)
    }
}

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug)]
pub struct PlaceGridParams {
    pub base: AssetId,
    pub quote: AssetId,
    pub ask_strategy: Address,
    pub ask_data: Vec<u8>,
    pub ask_count: u32,
    pub bid_strategy: Address,
    pub bid_data: Vec<u8>,
    pub bid_count: u32,
    pub base_amount: u64,
    /// Ignored for oneshot grids, which take the protocol-wide oneshot fee.
    pub fee_ppm: u32,
    pub compound: bool,
    pub oneshot: bool,
    /// Native coin attached to fund a native leg; excess is refunded.
    pub native_value: u64,
}

#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct FillTarget {
    pub order_id: OrderId,
    /// Base amount the taker wants to buy (fill ask) or sell (fill bid).
    pub base_amount: u64,
}

#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug)]
pub struct FillOrderParams {
    pub target: FillTarget,
    /// Minimum base that must be filled after clamping to available liquidity.
    pub min_base: u64,
    pub native_value: u64,
}

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug)]
pub struct FillOrdersParams {
    pub grid_id: u64,
    pub fills: Vec<FillTarget>,
    /// Cap on the aggregate base filled across the batch.
    pub max_base: u64,
    pub min_base: u64,
    pub native_value: u64,
}

impl FillOrderParams {
    pub fn new(order_id: OrderId, base_amount: u64, min_base: u64) -> Self {
        Self {
            target: FillTarget { order_id, base_amount },
            min_base,
            native_value: 0,
        }
    }
}
