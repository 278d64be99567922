use std::collections::BTreeMap;

use borsh::BorshDeserialize;

use crate::error::{GridError, Result};
use crate::instruction::LinearParams;
use crate::math::quote_for;
use crate::state::Address;

use super::{PriceStrategy, StrategyKey};

/// Arithmetic ladder: `price(i) = price0 + i * gap`.
#[derive(Clone, Debug)]
pub struct LinearStrategy {
    engine: Address,
    params: BTreeMap<StrategyKey, LinearParams>,
}

impl LinearStrategy {
    pub fn new(engine: Address) -> Self {
        Self {
            engine,
            params: BTreeMap::new(),
        }
    }

    fn decode(data: &[u8]) -> Result<LinearParams> {
        LinearParams::try_from_slice(data).map_err(|_| GridError::InvalidParams)
    }

    fn params(&self, key: StrategyKey) -> Result<&LinearParams> {
        self.params.get(&key).ok_or(GridError::GridNotFound)
    }

    pub(crate) fn forget(&mut self, key: StrategyKey) {
        self.params.remove(&key);
    }
}

fn level_price(p: &LinearParams, level: i64) -> Result<u64> {
    let step = i128::from(p.gap)
        .checked_mul(i128::from(level))
        .ok_or(GridError::MathOverflow)?;
    let price = i128::from(p.price0)
        .checked_add(step)
        .ok_or(GridError::MathOverflow)?;
    if price <= 0 {
        return Err(GridError::InvalidPriceOrRatio);
    }
    u64::try_from(price).map_err(|_| GridError::MathOverflow)
}

impl PriceStrategy for LinearStrategy {
    fn validate_params(&self, is_ask: bool, base_amount: u64, data: &[u8], order_count: u32) -> Result<()> {
        let p = Self::decode(data)?;
        if p.price0 == 0 {
            return Err(GridError::InvalidPriceOrRatio);
        }
        if order_count == 0 {
            return Err(GridError::InvalidCount);
        }
        if (is_ask && p.gap <= 0) || (!is_ask && p.gap >= 0) {
            return Err(GridError::InvalidPriceOrRatio);
        }

        // The flip target of level 0 sits one gap beyond price0, the far end of
        // the ladder at count - 1.
        let last = level_price(&p, i64::from(order_count) - 1)?;
        let rev0 = level_price(&p, -1)?;
        let (lowest, highest) = if is_ask { (rev0, last) } else { (last, rev0) };

        quote_for(base_amount, highest)?;
        if quote_for(base_amount, lowest)? == 0 {
            return Err(if is_ask {
                GridError::AskZeroQuote
            } else {
                GridError::BidZeroQuote
            });
        }
        Ok(())
    }

    fn create_grid_strategy(&mut self, caller: &Address, key: StrategyKey, data: &[u8]) -> Result<()> {
        if *caller != self.engine {
            return Err(GridError::Unauthorized);
        }
        if self.params.contains_key(&key) {
            return Err(GridError::AlreadyExists);
        }
        let p = Self::decode(data)?;
        self.params.insert(key, p);
        Ok(())
    }

    fn price_at(&self, key: StrategyKey, index: u32) -> Result<u64> {
        level_price(self.params(key)?, i64::from(index))
    }

    fn reverse_price_at(&self, key: StrategyKey, index: u32) -> Result<u64> {
        level_price(self.params(key)?, i64::from(index) - 1)
    }
}
