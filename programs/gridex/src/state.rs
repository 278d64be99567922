use core::fmt;
use core::str::FromStr;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::constants::{BPS_DENOMINATOR, GRID_ID_SHIFT, ORDER_INDEX_BITS};
use crate::error::{GridError, Result};

/// 32-byte account identity: grid owners, takers, the engine, the vault, strategies.
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(pub [u8; 32]);

impl Address {
    pub const ZERO: Address = Address([0u8; 32]);

    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// An address whose bytes are all `byte`; handy for fixed well-known ids.
    pub const fn repeat_byte(byte: u8) -> Self {
        Self([byte; 32])
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl FromStr for Address {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        if s.len() != 64 || !s.is_ascii() {
            return Err(GridError::InvalidConfig);
        }
        let mut out = [0u8; 32];
        for (i, byte) in out.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&s[i * 2..i * 2 + 2], 16).map_err(|_| GridError::InvalidConfig)?;
        }
        Ok(Self(out))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> core::result::Result<Self, D::Error> {
        let s = <String as Deserialize>::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AssetId {
    /// The chain's native coin.
    Native,
    Token(Address),
}

impl AssetId {
    pub fn is_native(&self) -> bool {
        matches!(self, AssetId::Native)
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetId::Native => f.write_str("native"),
            AssetId::Token(addr) => write!(f, "token:{addr}"),
        }
    }
}

/// Side of a grid slot: `Ask` offers base for quote, `Bid` offers quote for base.
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Side {
    Ask,
    Bid,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Ask => Side::Bid,
            Side::Bid => Side::Ask,
        }
    }

    pub fn is_ask(self) -> bool {
        self == Side::Ask
    }
}

/// External order handle.
///
/// Layout, most significant bits first: `grid_id` (64 bits), reserved (32 bits,
/// always zero), `order_index` (32 bits).
pub type OrderId = u128;

#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OrderKey {
    pub grid_id: u64,
    pub order_index: u32,
}

impl OrderKey {
    pub fn new(grid_id: u64, order_index: u32) -> Self {
        Self { grid_id, order_index }
    }

    pub fn pack(&self) -> OrderId {
        ((self.grid_id as u128) << GRID_ID_SHIFT) | self.order_index as u128
    }

    pub fn unpack(id: OrderId) -> Result<Self> {
        let reserved_mask = ((1u128 << GRID_ID_SHIFT) - 1) & !((1u128 << ORDER_INDEX_BITS) - 1);
        if id & reserved_mask != 0 {
            return Err(GridError::InvalidOrderId);
        }
        Ok(Self {
            grid_id: (id >> GRID_ID_SHIFT) as u64,
            order_index: (id & ((1u128 << ORDER_INDEX_BITS) - 1)) as u32,
        })
    }
}

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct Pair {
    pub id: u64,
    pub base: AssetId,
    pub quote: AssetId,
    pub paused: bool,
}

impl Pair {
    pub fn has_native_leg(&self) -> bool {
        self.base.is_native() || self.quote.is_native()
    }

    pub fn asset(&self, side: Side) -> AssetId {
        match side {
            Side::Ask => self.base,
            Side::Bid => self.quote,
        }
    }
}

#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum GridStatus {
    Active,
    Canceled,
}

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct GridConfig {
    pub id: u64,
    pub owner: Address,
    pub pair_id: u64,
    pub ask_strategy: Address,
    pub bid_strategy: Address,
    /// Millionths of the quote notional charged per fill.
    pub fee_ppm: u32,
    pub ask_count: u32,
    pub bid_count: u32,
    /// Base amount each slot is sized for.
    pub base_amount: u64,
    pub compound: bool,
    pub oneshot: bool,
    pub status: GridStatus,
    /// Accrued maker profit, quote denominated.
    pub profits: u64,
}

impl GridConfig {
    pub fn is_active(&self) -> bool {
        self.status == GridStatus::Active
    }

    pub fn order_count(&self) -> u32 {
        self.ask_count.saturating_add(self.bid_count)
    }

    /// Home side and strategy level of a slot. Ask slots come first.
    pub fn level_of(&self, order_index: u32) -> Result<(Side, u32)> {
        if order_index < self.ask_count {
            Ok((Side::Ask, order_index))
        } else if order_index - self.ask_count < self.bid_count {
            Ok((Side::Bid, order_index - self.ask_count))
        } else {
            Err(GridError::OrderNotFound)
        }
    }
}

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct OrderSlot {
    /// Balance in the asset the slot currently offers.
    pub amount: u64,
    /// Balance in the opposite asset, accrued by fills.
    pub reverse_amount: u64,
    pub side: Side,
    pub oneshot: bool,
    pub canceled: bool,
}

impl OrderSlot {
    pub fn new(side: Side, amount: u64, oneshot: bool) -> Self {
        Self {
            amount,
            reverse_amount: 0,
            side,
            oneshot,
            canceled: false,
        }
    }

    /// `(base, quote)` currently held by the slot.
    pub fn balances(&self) -> (u64, u64) {
        match self.side {
            Side::Ask => (self.amount, self.reverse_amount),
            Side::Bid => (self.reverse_amount, self.amount),
        }
    }

    pub fn is_partially_filled(&self) -> bool {
        self.amount > 0 && self.reverse_amount > 0
    }
}

/// Splits a fill fee into `(protocol_fee, lp_fee)`.
///
/// Oneshot grids route the whole fee to the protocol.
pub fn split_fee(total_fee: u64, protocol_share_bps: u16, oneshot: bool) -> (u64, u64) {
    if oneshot {
        return (total_fee, 0);
    }
    let share = (protocol_share_bps as u64).min(BPS_DENOMINATOR);
    let protocol_fee = ((total_fee as u128 * share as u128) / BPS_DENOMINATOR as u128) as u64;
    (protocol_fee, total_fee - protocol_fee)
}
