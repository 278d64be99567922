//! The grid exchange engine.
//!
//! [`Exchange`] owns every grid, slot, pair and strategy record plus the asset
//! ledger. Public mutators run inside [`Exchange::atomic`], which opens a
//! checkpoint on engine state and ledger and reverts both when the call fails,
//! so no error ever leaves a half-applied fill behind.

pub mod admin;
pub mod cancel;
pub mod fill;
pub mod place;
mod store;

use tracing::warn;

use crate::config::{ConfigError, ExchangeConfig};
use crate::error::{GridError, Result};
use crate::guard::CallDepth;
use crate::ledger::AssetLedger;
use crate::state::{Address, AssetId, GridConfig, OrderId, OrderKey, OrderSlot, Pair, Side};
use crate::strategy::{PriceStrategy, StrategyKey};

pub use fill::FillReceipt;
use store::ExchangeState;

/// Read-only view of a slot with the two prices it trades at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderView {
    pub order_id: OrderId,
    pub grid_id: u64,
    pub order_index: u32,
    pub slot: OrderSlot,
    /// Price at which the slot sells base.
    pub ask_price: u64,
    /// Price at which the slot buys base.
    pub bid_price: u64,
}

pub struct Exchange<L> {
    pub(crate) state: ExchangeState,
    pub(crate) ledger: L,
    pub(crate) depth: CallDepth,
    /// Takers whose settlement callbacks are running, innermost last.
    pub(crate) payers: Vec<Address>,
}

impl<L: AssetLedger> Exchange<L> {
    pub fn new(config: ExchangeConfig, ledger: L) -> core::result::Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            state: ExchangeState::new(config),
            ledger,
            depth: CallDepth::new(),
            payers: Vec::new(),
        })
    }

    /// Ledger account that holds all grid funds.
    pub fn address(&self) -> Address {
        self.state.config().engine
    }

    pub fn config(&self) -> &ExchangeConfig {
        self.state.config()
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Direct ledger access for the host between calls. Refused while any fill
    /// is in progress; settlement callbacks pay through [`Exchange::pay`].
    pub fn ledger_mut(&mut self) -> Result<&mut L> {
        self.depth.ensure_idle()?;
        Ok(&mut self.ledger)
    }

    pub fn into_ledger(self) -> L {
        self.ledger
    }

    pub fn call_depth(&self) -> usize {
        self.depth.get()
    }

    pub fn is_paused(&self) -> bool {
        self.state.paused()
    }

    pub fn grid(&self, grid_id: u64) -> Result<&GridConfig> {
        self.state.grid(grid_id)
    }

    pub fn grid_profits(&self, grid_id: u64) -> Result<u64> {
        Ok(self.grid(grid_id)?.profits)
    }

    pub fn pair(&self, pair_id: u64) -> Result<&Pair> {
        self.state.pairs().get(pair_id)
    }

    pub fn pair_id_of(&self, base: &AssetId, quote: &AssetId) -> Option<u64> {
        self.state.pairs().find(base, quote)
    }

    pub fn order(&self, order_id: OrderId) -> Result<OrderView> {
        let key = OrderKey::unpack(order_id)?;
        let grid = self.grid(key.grid_id)?;
        let slot = self.state.order(&key)?;
        let (ask_price, bid_price) = self.slot_prices(grid, key.order_index)?;
        Ok(OrderView {
            order_id,
            grid_id: key.grid_id,
            order_index: key.order_index,
            slot: slot.clone(),
            ask_price,
            bid_price,
        })
    }

    /// Price of level `index` on one side of a grid.
    pub fn price_at(&self, grid_id: u64, side: Side, index: u32) -> Result<u64> {
        let grid = self.grid(grid_id)?;
        let strategy = self.state.strategies().get(&strategy_id(grid, side))?;
        strategy.price_at(StrategyKey::new(grid_id, side), index)
    }

    pub fn reverse_price_at(&self, grid_id: u64, side: Side, index: u32) -> Result<u64> {
        let grid = self.grid(grid_id)?;
        let strategy = self.state.strategies().get(&strategy_id(grid, side))?;
        strategy.reverse_price_at(StrategyKey::new(grid_id, side), index)
    }

    /// `(ask_price, bid_price)` of a slot. A home-ask slot sells at its level
    /// price and buys back one level lower; a home-bid slot buys at its level
    /// price and sells one level higher.
    pub(crate) fn slot_prices(&self, grid: &GridConfig, order_index: u32) -> Result<(u64, u64)> {
        let (home, level) = grid.level_of(order_index)?;
        let strategy = self.state.strategies().get(&strategy_id(grid, home))?;
        let key = StrategyKey::new(grid.id, home);
        let price = strategy.price_at(key, level)?;
        let reverse = strategy.reverse_price_at(key, level)?;
        Ok(match home {
            Side::Ask => (price, reverse),
            Side::Bid => (reverse, price),
        })
    }

    /// Runs `f` as one all-or-nothing call. Checkpoints nest, so a failed
    /// nested fill only reverts its own writes.
    pub(crate) fn atomic<T>(&mut self, op: &'static str, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let state_checkpoint = self.state.checkpoint();
        let ledger_checkpoint = self.ledger.checkpoint();
        match f(self) {
            Ok(v) => {
                self.ledger.checkpoint_commit(ledger_checkpoint);
                self.state.checkpoint_commit(state_checkpoint);
                Ok(v)
            }
            Err(err) => {
                warn!(op, %err, depth = self.depth.get(), "call reverted");
                self.ledger.checkpoint_revert(ledger_checkpoint);
                self.state.checkpoint_revert(state_checkpoint);
                Err(err)
            }
        }
    }

    pub(crate) fn owned_grid(&self, caller: &Address, grid_id: u64) -> Result<&GridConfig> {
        let grid = self.grid(grid_id)?;
        if grid.owner != *caller {
            return Err(GridError::NotGridOwner);
        }
        Ok(grid)
    }

    pub(crate) fn grid_mut(&mut self, grid_id: u64) -> Result<&mut GridConfig> {
        self.state.grid_mut(grid_id)
    }

    /// Sends `amount` of `asset` out of the engine.
    pub(crate) fn send(&mut self, asset: &AssetId, to: &Address, amount: u64) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        let engine = self.address();
        self.ledger.transfer(asset, &engine, to, amount).map_err(|err| {
            if asset.is_native() {
                GridError::NativeTransferFailed
            } else {
                GridError::Asset(err)
            }
        })
    }

    /// Pulls `amount` of `asset` from `from` into the engine using its allowance.
    pub(crate) fn pull(&mut self, asset: &AssetId, from: &Address, amount: u64) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        let engine = self.address();
        self.ledger.transfer_from(asset, &engine, from, &engine, amount)?;
        Ok(())
    }

    pub(crate) fn engine_balance(&self, asset: &AssetId) -> u64 {
        self.ledger.balance_of(asset, &self.state.config().engine)
    }

    pub(crate) fn fill_flow(&self, asset: &AssetId) -> i128 {
        self.state.fill_flow(asset)
    }
}

fn strategy_id(grid: &GridConfig, side: Side) -> Address {
    match side {
        Side::Ask => grid.ask_strategy,
        Side::Bid => grid.bid_strategy,
    }
}
