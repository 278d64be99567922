//! Price strategies.
//!
//! A strategy turns per-grid parameters into the price of every slot on one side
//! of a grid. Parameters are registered once per `(grid_id, side)` by the engine
//! and never change afterwards, so any caller can recompute the same ladder.

pub mod geometric;
pub mod linear;

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{GridError, Result};
use crate::state::{Address, Side};

pub use geometric::GeometricStrategy;
pub use linear::LinearStrategy;

/// Well-known id of the built-in linear strategy.
pub const LINEAR_STRATEGY_ID: Address = Address::repeat_byte(0x11);
/// Well-known id of the built-in geometric strategy.
pub const GEOMETRIC_STRATEGY_ID: Address = Address::repeat_byte(0x22);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StrategyKey {
    pub grid_id: u64,
    pub side: Side,
}

impl StrategyKey {
    pub fn new(grid_id: u64, side: Side) -> Self {
        Self { grid_id, side }
    }
}

pub trait PriceStrategy {
    /// Checks that `data` describes a usable ladder of `order_count` levels.
    fn validate_params(&self, is_ask: bool, base_amount: u64, data: &[u8], order_count: u32) -> Result<()>;

    /// Stores the parameters for `key`. Only the engine may call this, once per key.
    fn create_grid_strategy(&mut self, caller: &Address, key: StrategyKey, data: &[u8]) -> Result<()>;

    fn price_at(&self, key: StrategyKey, index: u32) -> Result<u64>;

    /// Price of the neighbouring level a filled slot flips to.
    fn reverse_price_at(&self, key: StrategyKey, index: u32) -> Result<u64>;
}

#[derive(Clone, Debug)]
pub enum Strategy {
    Linear(LinearStrategy),
    Geometric(GeometricStrategy),
}

impl PriceStrategy for Strategy {
    fn validate_params(&self, is_ask: bool, base_amount: u64, data: &[u8], order_count: u32) -> Result<()> {
        match self {
            Strategy::Linear(s) => s.validate_params(is_ask, base_amount, data, order_count),
            Strategy::Geometric(s) => s.validate_params(is_ask, base_amount, data, order_count),
        }
    }

    fn create_grid_strategy(&mut self, caller: &Address, key: StrategyKey, data: &[u8]) -> Result<()> {
        match self {
            Strategy::Linear(s) => s.create_grid_strategy(caller, key, data),
            Strategy::Geometric(s) => s.create_grid_strategy(caller, key, data),
        }
    }

    fn price_at(&self, key: StrategyKey, index: u32) -> Result<u64> {
        match self {
            Strategy::Linear(s) => s.price_at(key, index),
            Strategy::Geometric(s) => s.price_at(key, index),
        }
    }

    fn reverse_price_at(&self, key: StrategyKey, index: u32) -> Result<u64> {
        match self {
            Strategy::Linear(s) => s.reverse_price_at(key, index),
            Strategy::Geometric(s) => s.reverse_price_at(key, index),
        }
    }
}

impl Strategy {
    /// Drops the parameters registered for `key`, undoing a failed placement.
    pub(crate) fn forget(&mut self, key: StrategyKey) {
        match self {
            Strategy::Linear(s) => s.forget(key),
            Strategy::Geometric(s) => s.forget(key),
        }
    }
}

/// Installed strategies plus the allowlist gating which ones new grids may use.
#[derive(Clone, Debug, Default)]
pub struct StrategyRegistry {
    strategies: BTreeMap<Address, Strategy>,
    allowed: BTreeSet<Address>,
}

impl StrategyRegistry {
    /// Registry with the linear and geometric strategies installed and allowed.
    pub fn with_builtins(engine: Address) -> Self {
        let mut registry = Self::default();
        registry
            .strategies
            .insert(LINEAR_STRATEGY_ID, Strategy::Linear(LinearStrategy::new(engine)));
        registry
            .strategies
            .insert(GEOMETRIC_STRATEGY_ID, Strategy::Geometric(GeometricStrategy::new(engine)));
        registry.allowed.insert(LINEAR_STRATEGY_ID);
        registry.allowed.insert(GEOMETRIC_STRATEGY_ID);
        registry
    }

    pub fn install(&mut self, id: Address, strategy: Strategy) -> Result<()> {
        if self.strategies.contains_key(&id) {
            return Err(GridError::AlreadyExists);
        }
        self.strategies.insert(id, strategy);
        Ok(())
    }

    /// Updates the allowlist and returns whether `id` was allowed before.
    pub fn set_allowed(&mut self, id: Address, allowed: bool) -> Result<bool> {
        if !self.strategies.contains_key(&id) {
            return Err(GridError::StrategyNotAllowed);
        }
        let was_allowed = self.is_allowed(&id);
        if allowed {
            self.allowed.insert(id);
        } else {
            self.allowed.remove(&id);
        }
        Ok(was_allowed)
    }

    pub(crate) fn uninstall(&mut self, id: &Address) {
        self.strategies.remove(id);
        self.allowed.remove(id);
    }

    pub(crate) fn forget_grid_strategy(&mut self, id: &Address, key: StrategyKey) {
        if let Some(strategy) = self.strategies.get_mut(id) {
            strategy.forget(key);
        }
    }

    pub fn is_allowed(&self, id: &Address) -> bool {
        self.allowed.contains(id)
    }

    /// Looks up an installed strategy regardless of the allowlist; existing grids
    /// keep pricing through strategies that were later disallowed.
    pub fn get(&self, id: &Address) -> Result<&Strategy> {
        self.strategies.get(id).ok_or(GridError::StrategyNotAllowed)
    }

    /// Looks up a strategy that new grids may use.
    pub fn allowed(&self, id: &Address) -> Result<&Strategy> {
        if !self.is_allowed(id) {
            return Err(GridError::StrategyNotAllowed);
        }
        self.get(id)
    }

    pub fn allowed_mut(&mut self, id: &Address) -> Result<&mut Strategy> {
        if !self.is_allowed(id) {
            return Err(GridError::StrategyNotAllowed);
        }
        self.strategies.get_mut(id).ok_or(GridError::StrategyNotAllowed)
    }
}
