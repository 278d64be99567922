use std::collections::BTreeMap;

use borsh::BorshDeserialize;

use crate::constants::PRICE_SCALE;
use crate::error::{GridError, Result};
use crate::instruction::GeometricParams;
use crate::math::{mul_div, quote_for, scale_by_ratio_pow};
use crate::state::Address;

use super::{PriceStrategy, StrategyKey};

/// Geometric ladder: `price(i) = price0 * ratio^i`.
#[derive(Clone, Debug)]
pub struct GeometricStrategy {
    engine: Address,
    params: BTreeMap<StrategyKey, GeometricParams>,
}

impl GeometricStrategy {
    pub fn new(engine: Address) -> Self {
        Self {
            engine,
            params: BTreeMap::new(),
        }
    }

    fn decode(data: &[u8]) -> Result<GeometricParams> {
        GeometricParams::try_from_slice(data).map_err(|_| GridError::InvalidParams)
    }

    fn params(&self, key: StrategyKey) -> Result<&GeometricParams> {
        self.params.get(&key).ok_or(GridError::GridNotFound)
    }

    pub(crate) fn forget(&mut self, key: StrategyKey) {
        self.params.remove(&key);
    }
}

fn level_price(p: &GeometricParams, level: u32) -> Result<u64> {
    scale_by_ratio_pow(p.price0, p.ratio, level)
}

fn reverse_level_price(p: &GeometricParams, level: u32) -> Result<u64> {
    if level == 0 {
        mul_div(p.price0, PRICE_SCALE, p.ratio)
    } else {
        level_price(p, level - 1)
    }
}

impl PriceStrategy for GeometricStrategy {
    fn validate_params(&self, is_ask: bool, base_amount: u64, data: &[u8], order_count: u32) -> Result<()> {
        let p = Self::decode(data)?;
        if p.price0 == 0 || p.ratio == 0 {
            return Err(GridError::InvalidPriceOrRatio);
        }
        if order_count == 0 {
            return Err(GridError::InvalidCount);
        }
        if is_ask && p.ratio <= PRICE_SCALE {
            return Err(GridError::AskRatioTooLow);
        }
        if !is_ask && p.ratio >= PRICE_SCALE {
            return Err(GridError::BidRatioTooHigh);
        }

        // Walk the whole ladder from the flip target of level 0 outwards. Each
        // level must be strictly beyond the previous one after rounding.
        let rev0 = reverse_level_price(&p, 0)?;
        let mut prev = rev0;
        let mut last = rev0;
        for level in 0..order_count {
            let price = level_price(&p, level)?;
            let moves_away = if is_ask { price > prev } else { price < prev };
            if !moves_away {
                return Err(GridError::InvalidPriceOrRatio);
            }
            prev = price;
            last = price;
        }

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
        level_price(self.params(key)?, index)
    }

    fn reverse_price_at(&self, key: StrategyKey, index: u32) -> Result<u64> {
        reverse_level_price(self.params(key)?, index)
    }
}
