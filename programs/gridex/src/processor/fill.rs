//! Taker fills: pricing, slot bookkeeping, flips and settlement.

use tracing::debug;

use crate::constants::PRICE_SCALE;
use crate::error::{GridError, Result};
use crate::instruction::{FillOrderParams, FillOrdersParams, FillTarget};
use crate::ledger::AssetLedger;
use crate::math::{calc_fee, quote_for, quote_for_up, u128_to_u64};
use crate::settlement::{NativeCredit, Payment, Settle};
use crate::state::{split_fee, Address, AssetId, OrderId, OrderKey, OrderSlot, Side};

use super::Exchange;

/// Totals of one fill call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FillReceipt {
    pub base_amount: u64,
    /// Quote notional before fees.
    pub quote_amount: u64,
    pub fee: u64,
    pub protocol_fee: u64,
    /// Orders that flipped side during the call.
    pub flipped: Vec<OrderId>,
}

impl FillReceipt {
    /// Quote the taker paid (buying) or received (selling).
    pub fn taker_quote(&self, side: Side) -> Result<u64> {
        match side {
            Side::Ask => self.quote_amount.checked_add(self.fee).ok_or(GridError::MathOverflow),
            Side::Bid => self.quote_amount.checked_sub(self.fee).ok_or(GridError::MathOverflow),
        }
    }

    fn absorb(&mut self, fill: &OrderFill) -> Result<()> {
        self.base_amount = self.base_amount.checked_add(fill.base).ok_or(GridError::MathOverflow)?;
        self.quote_amount = self.quote_amount.checked_add(fill.quote).ok_or(GridError::MathOverflow)?;
        self.fee = self.fee.checked_add(fill.fee).ok_or(GridError::MathOverflow)?;
        self.protocol_fee = self
            .protocol_fee
            .checked_add(fill.protocol_fee)
            .ok_or(GridError::MathOverflow)?;
        if fill.flipped {
            self.flipped.push(fill.key.pack());
        }
        Ok(())
    }
}

/// Outcome of filling a single slot.
#[derive(Clone, Debug)]
struct OrderFill {
    key: OrderKey,
    base: u64,
    quote: u64,
    fee: u64,
    protocol_fee: u64,
    flipped: bool,
    /// Oneshot proceeds owed to the grid owner.
    payout: Option<(Address, AssetId, u64)>,
}

/// Adds `add` quote to a slot balance. Capped balances stop at `quota`; the
/// overflow is returned as profit.
fn accrue_quote(current: u64, add: u64, quota: u64, capped: bool) -> Result<(u64, u64)> {
    let next = current.checked_add(add).ok_or(GridError::MathOverflow)?;
    if !capped || next <= quota {
        return Ok((next, 0));
    }
    if current >= quota {
        return Ok((current, add));
    }
    Ok((quota, next - quota))
}

/// Taker buys base from an ask slot.
fn apply_ask_bookkeeping(slot: &mut OrderSlot, fill_base: u64, quote: u64, quota: u64, capped: bool) -> Result<u64> {
    slot.amount = slot.amount.checked_sub(fill_base).ok_or(GridError::MathOverflow)?;
    let (reverse, overflow) = accrue_quote(slot.reverse_amount, quote, quota, capped)?;
    slot.reverse_amount = reverse;
    Ok(overflow)
}

/// Taker sells base into a bid slot.
fn apply_bid_bookkeeping(slot: &mut OrderSlot, fill_base: u64, quote: u64) -> Result<()> {
    slot.amount = slot.amount.checked_sub(quote).ok_or(GridError::MathOverflow)?;
    slot.reverse_amount = slot
        .reverse_amount
        .checked_add(fill_base)
        .ok_or(GridError::MathOverflow)?;
    Ok(())
}

/// Taker sells base to an ask slot's quote proceeds.
fn apply_ask_reverse_bookkeeping(slot: &mut OrderSlot, fill_base: u64, quote: u64) -> Result<()> {
    slot.reverse_amount = slot.reverse_amount.checked_sub(quote).ok_or(GridError::MathOverflow)?;
    slot.amount = slot.amount.checked_add(fill_base).ok_or(GridError::MathOverflow)?;
    Ok(())
}

/// Taker buys back the base a bid slot accumulated.
fn apply_bid_reverse_bookkeeping(
    slot: &mut OrderSlot,
    fill_base: u64,
    quote: u64,
    quota: u64,
    capped: bool,
) -> Result<u64> {
    slot.reverse_amount = slot
        .reverse_amount
        .checked_sub(fill_base)
        .ok_or(GridError::MathOverflow)?;
    let (amount, overflow) = accrue_quote(slot.amount, quote, quota, capped)?;
    slot.amount = amount;
    Ok(overflow)
}

/// Turns an exhausted slot around: its proceeds become the new offer.
fn flip_slot(slot: &mut OrderSlot, quota: u64, capped: bool) -> Result<u64> {
    let next_side = slot.side.opposite();
    let (amount, overflow) = match next_side {
        Side::Bid => accrue_quote(0, slot.reverse_amount, quota, capped)?,
        Side::Ask => (slot.reverse_amount, 0),
    };
    slot.amount = amount;
    slot.reverse_amount = 0;
    slot.side = next_side;
    Ok(overflow)
}

/// Quote-for-base sizing of one fill, clamped to what the slot can give.
fn size_fill(taker_side: Side, req_base: u64, available: u64, ask_price: u64, bid_price: u64) -> Result<(u64, u64)> {
    match taker_side {
        Side::Ask => {
            let fill_base = req_base.min(available);
            Ok((fill_base, quote_for_up(fill_base, ask_price)?))
        }
        Side::Bid => {
            if bid_price == 0 {
                return Err(GridError::MathOverflow);
            }
            // Base that takes every unit of quote the slot holds. Requests at or
            // above it are clamped before any quote is computed.
            let full_base = (available as u128 * PRICE_SCALE as u128).div_ceil(bid_price as u128);
            if req_base as u128 >= full_base {
                Ok((u128_to_u64(full_base)?, available))
            } else {
                Ok((req_base, quote_for(req_base, bid_price)?))
            }
        }
    }
}

impl<L: AssetLedger> Exchange<L> {
    /// Buys base from one slot at its ask price.
    pub fn fill_ask(&mut self, taker: &Address, params: FillOrderParams, settle: Settle<'_, L>) -> Result<FillReceipt> {
        let grid_id = OrderKey::unpack(params.target.order_id)?.grid_id;
        self.fill(
            taker,
            Side::Ask,
            grid_id,
            &[params.target],
            params.target.base_amount,
            params.min_base,
            params.native_value,
            settle,
        )
    }

    /// Sells base into one slot at its bid price.
    pub fn fill_bid(&mut self, taker: &Address, params: FillOrderParams, settle: Settle<'_, L>) -> Result<FillReceipt> {
        let grid_id = OrderKey::unpack(params.target.order_id)?.grid_id;
        self.fill(
            taker,
            Side::Bid,
            grid_id,
            &[params.target],
            params.target.base_amount,
            params.min_base,
            params.native_value,
            settle,
        )
    }

    pub fn fill_ask_orders(
        &mut self,
        taker: &Address,
        params: FillOrdersParams,
        settle: Settle<'_, L>,
    ) -> Result<FillReceipt> {
        self.fill(
            taker,
            Side::Ask,
            params.grid_id,
            &params.fills,
            params.max_base,
            params.min_base,
            params.native_value,
            settle,
        )
    }

    pub fn fill_bid_orders(
        &mut self,
        taker: &Address,
        params: FillOrdersParams,
        settle: Settle<'_, L>,
    ) -> Result<FillReceipt> {
        self.fill(
            taker,
            Side::Bid,
            params.grid_id,
            &params.fills,
            params.max_base,
            params.min_base,
            params.native_value,
            settle,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn fill(
        &mut self,
        taker: &Address,
        side: Side,
        grid_id: u64,
        targets: &[FillTarget],
        max_base: u64,
        min_base: u64,
        native_value: u64,
        settle: Settle<'_, L>,
    ) -> Result<FillReceipt> {
        let _guard = self.depth.enter_fill();
        let op = match side {
            Side::Ask => "fill_ask",
            Side::Bid => "fill_bid",
        };
        self.atomic(op, |ex| {
            ex.fill_inner(taker, side, grid_id, targets, max_base, min_base, native_value, settle)
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn fill_inner(
        &mut self,
        taker: &Address,
        side: Side,
        grid_id: u64,
        targets: &[FillTarget],
        max_base: u64,
        min_base: u64,
        native_value: u64,
        settle: Settle<'_, L>,
    ) -> Result<FillReceipt> {
        if self.state.paused() {
            return Err(GridError::Paused);
        }
        if *taker == self.address() {
            return Err(GridError::Unauthorized);
        }
        if targets.is_empty() {
            return Err(GridError::InvalidBatch);
        }
        if max_base == 0 {
            return Err(GridError::ZeroAmount);
        }
        let pair = self.pair(self.grid(grid_id)?.pair_id)?.clone();
        if pair.paused {
            return Err(GridError::PairPaused);
        }

        let assets = [pair.base, pair.quote];
        let balances_start = assets.map(|a| self.engine_balance(&a));
        let flows_start = assets.map(|a| self.fill_flow(&a));

        let keys = targets
            .iter()
            .map(|target| {
                let key = OrderKey::unpack(target.order_id)?;
                if key.grid_id != grid_id {
                    return Err(GridError::InvalidBatch);
                }
                Ok((key, target.base_amount))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut credit = NativeCredit::deposit(self, *taker, native_value, &pair)?;

        let mut receipt = FillReceipt::default();
        let mut payouts = Vec::new();
        let mut base_left = max_base;
        for (key, req_base) in keys {
            if base_left == 0 {
                break;
            }
            let fill = self.execute_single_fill(side, key, req_base.min(base_left))?;
            base_left -= fill.base.min(base_left);
            receipt.absorb(&fill)?;
            payouts.extend(fill.payout);
        }
        if receipt.base_amount < min_base {
            return Err(GridError::Slippage);
        }

        let payment = match side {
            Side::Ask => Payment {
                out_asset: pair.base,
                out_amount: receipt.base_amount,
                owed_asset: pair.quote,
                owed_amount: receipt.taker_quote(side)?,
            },
            Side::Bid => Payment {
                out_asset: pair.quote,
                out_amount: receipt.taker_quote(side)?,
                owed_asset: pair.base,
                owed_amount: receipt.base_amount,
            },
        };
        self.settle(taker, payment, settle, &mut credit)?;

        let vault = self.state.config().vault;
        self.send(&pair.quote, &vault, receipt.protocol_fee)?;
        for (owner, asset, amount) in payouts {
            self.send(&asset, &owner, amount)?;
        }
        credit.refund(self)?;

        for (i, asset) in assets.iter().enumerate() {
            let delta = self.engine_balance(asset) as i128 - balances_start[i] as i128;
            self.state.set_fill_flow(*asset, flows_start[i] + delta);
        }

        debug!(
            %taker,
            ?side,
            grid_id,
            base = receipt.base_amount,
            quote = receipt.quote_amount,
            fee = receipt.fee,
            flipped = receipt.flipped.len(),
            depth = self.depth.get(),
            "fill settled"
        );
        Ok(receipt)
    }

    /// Prices one slot and applies its bookkeeping. No assets move here.
    fn execute_single_fill(&mut self, taker_side: Side, key: OrderKey, req_base: u64) -> Result<OrderFill> {
        let grid = self.grid(key.grid_id)?.clone();
        let (ask_price, bid_price) = self.slot_prices(&grid, key.order_index)?;
        let mut slot = self.state.order(&key)?.clone();

        if slot.canceled {
            return Err(GridError::OrderCanceled);
        }
        let forward = slot.side == taker_side;
        if !forward && slot.oneshot {
            return Err(GridError::FillReversedOneShotOrder);
        }
        let available = if forward { slot.amount } else { slot.reverse_amount };
        if req_base == 0 || available == 0 {
            return Err(GridError::ZeroAmount);
        }

        let (fill_base, quote) = size_fill(taker_side, req_base, available, ask_price, bid_price)?;
        if fill_base == 0 || quote == 0 {
            return Err(GridError::ZeroAmount);
        }
        let fee = calc_fee(quote, grid.fee_ppm)?;
        let (protocol_fee, lp_fee) = split_fee(fee, self.state.config().protocol_fee_share_bps, grid.oneshot);

        let capped = !grid.compound && !grid.oneshot;
        let quota = quote_for(grid.base_amount, bid_price)?;
        let mut profit = lp_fee;
        let gap = match (taker_side, slot.side) {
            (Side::Ask, Side::Ask) => apply_ask_bookkeeping(&mut slot, fill_base, quote, quota, capped)?,
            (Side::Bid, Side::Bid) => {
                apply_bid_bookkeeping(&mut slot, fill_base, quote)?;
                0
            }
            (Side::Bid, Side::Ask) => {
                apply_ask_reverse_bookkeeping(&mut slot, fill_base, quote)?;
                0
            }
            (Side::Ask, Side::Bid) => apply_bid_reverse_bookkeeping(&mut slot, fill_base, quote, quota, capped)?,
        };
        profit = profit.checked_add(gap).ok_or(GridError::MathOverflow)?;

        let mut flipped = false;
        let mut payout = None;
        if forward && slot.amount == 0 {
            flipped = true;
            if slot.oneshot {
                let pair = self.pair(grid.pair_id)?;
                let proceeds_asset = pair.asset(slot.side.opposite());
                payout = Some((grid.owner, proceeds_asset, slot.reverse_amount));
                slot.reverse_amount = 0;
                slot.side = slot.side.opposite();
                slot.canceled = true;
            } else {
                let overflow = flip_slot(&mut slot, quota, capped)?;
                profit = profit.checked_add(overflow).ok_or(GridError::MathOverflow)?;
            }
            debug!(grid_id = key.grid_id, order_index = key.order_index, side = ?slot.side, oneshot = slot.oneshot, "order flipped");
        }

        let grid_mut = self.grid_mut(key.grid_id)?;
        grid_mut.profits = grid_mut.profits.checked_add(profit).ok_or(GridError::MathOverflow)?;
        self.state.insert_order(key, slot);

        debug!(
            grid_id = key.grid_id,
            order_index = key.order_index,
            ?taker_side,
            forward,
            base = fill_base,
            quote,
            fee,
            profit,
            "order filled"
        );
        Ok(OrderFill {
            key,
            base: fill_base,
            quote,
            fee,
            protocol_fee,
            flipped,
            payout,
        })
    }
}
