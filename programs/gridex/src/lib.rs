//! Grid trading exchange engine.
//!
//! Owners place grids: ladders of standing orders on a base/quote pair at prices
//! produced by a pluggable strategy. A filled ask becomes a bid one level lower
//! and vice versa, so liquidity recycles without owner action. Takers pay after
//! receiving, either by allowance pull or through a settlement callback that may
//! itself fill other orders.

pub mod config;
pub mod constants;
pub mod error;
pub mod guard;
pub mod instruction;
pub mod journal;
pub mod ledger;
pub mod math;
pub mod processor;
pub mod settlement;
pub mod state;
pub mod strategy;

pub use config::{ConfigError, ExchangeConfig};
pub use error::{GridError, LedgerError, Result};
pub use ledger::{AssetLedger, InMemoryLedger};
pub use processor::{Exchange, FillReceipt, OrderView};
pub use settlement::{FillCallback, FillCallbackContext, Settle};
pub use state::{Address, AssetId, GridConfig, GridStatus, OrderId, OrderKey, OrderSlot, Pair, Side};
