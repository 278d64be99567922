use tracing::info;

use crate::error::{GridError, Result};
use crate::instruction::PlaceGridParams;
use crate::ledger::AssetLedger;
use crate::math::{checked_sum, quote_for};
use crate::settlement::NativeCredit;
use crate::state::{Address, GridConfig, GridStatus, OrderKey, OrderSlot, Side};
use crate::strategy::{PriceStrategy, StrategyKey};

use super::Exchange;

impl<L: AssetLedger> Exchange<L> {
    /// Creates a grid, registers its price ladders and funds every slot from
    /// the owner. Returns the new grid id.
    pub fn place_grid(&mut self, owner: &Address, params: PlaceGridParams) -> Result<u64> {
        self.depth.ensure_idle()?;
        self.atomic("place_grid", |ex| ex.place_grid_inner(owner, params))
    }

    fn place_grid_inner(&mut self, owner: &Address, params: PlaceGridParams) -> Result<u64> {
        if self.state.paused() {
            return Err(GridError::Paused);
        }
        let pair = self.state.pair_or_create(params.base, params.quote)?;
        if pair.paused {
            return Err(GridError::PairPaused);
        }

        let config = self.state.config();
        let fee_ppm = if params.oneshot {
            config.oneshot_fee_ppm
        } else if config.fee_in_bounds(params.fee_ppm) {
            params.fee_ppm
        } else {
            return Err(GridError::InvalidFee);
        };
        if params.base_amount == 0 {
            return Err(GridError::ZeroAmount);
        }
        if params.ask_count == 0 && params.bid_count == 0 {
            return Err(GridError::InvalidCount);
        }
        if params.ask_count > config.max_orders_per_side || params.bid_count > config.max_orders_per_side {
            return Err(GridError::InvalidCount);
        }

        let sides = [
            (Side::Ask, params.ask_strategy, params.ask_data.as_slice(), params.ask_count),
            (Side::Bid, params.bid_strategy, params.bid_data.as_slice(), params.bid_count),
        ];
        for (side, strategy_id, data, count) in sides {
            if count == 0 {
                continue;
            }
            self.state
                .strategies()
                .allowed(&strategy_id)?
                .validate_params(side.is_ask(), params.base_amount, data, count)?;
        }

        let grid_id = self.state.allocate_grid_id()?;
        let engine = self.address();
        for (side, strategy_id, data, count) in sides {
            if count == 0 {
                continue;
            }
            self.state
                .register_grid_strategy(strategy_id, &engine, StrategyKey::new(grid_id, side), data)?;
        }

        let grid = GridConfig {
            id: grid_id,
            owner: *owner,
            pair_id: pair.id,
            ask_strategy: params.ask_strategy,
            bid_strategy: params.bid_strategy,
            fee_ppm,
            ask_count: params.ask_count,
            bid_count: params.bid_count,
            base_amount: params.base_amount,
            compound: params.compound,
            oneshot: params.oneshot,
            status: GridStatus::Active,
            profits: 0,
        };

        let mut base_slots = Vec::with_capacity(params.ask_count as usize);
        let mut quote_slots = Vec::with_capacity(params.bid_count as usize);
        for order_index in 0..grid.order_count() {
            let (side, _) = grid.level_of(order_index)?;
            let amount = match side {
                Side::Ask => {
                    base_slots.push(params.base_amount);
                    params.base_amount
                }
                Side::Bid => {
                    let (_, bid_price) = self.slot_prices(&grid, order_index)?;
                    let quote = quote_for(params.base_amount, bid_price)?;
                    quote_slots.push(quote);
                    quote
                }
            };
            self.state
                .insert_order(OrderKey::new(grid_id, order_index), OrderSlot::new(side, amount, params.oneshot));
        }
        let base_total = checked_sum(base_slots)?;
        let quote_total = checked_sum(quote_slots)?;
        self.state.insert_grid(grid);

        let mut credit = NativeCredit::deposit(self, *owner, params.native_value, &pair)?;
        for (asset, total) in [(pair.base, base_total), (pair.quote, quote_total)] {
            let required = credit.consume(&asset, total);
            self.pull(&asset, owner, required)?;
        }
        credit.refund(self)?;

        info!(
            grid_id,
            %owner,
            pair_id = pair.id,
            ask_count = params.ask_count,
            bid_count = params.bid_count,
            fee_ppm,
            base_total,
            quote_total,
            compound = params.compound,
            oneshot = params.oneshot,
            "grid placed"
        );
        Ok(grid_id)
    }
}
