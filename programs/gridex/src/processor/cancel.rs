use tracing::info;

use crate::error::{GridError, Result};
use crate::ledger::AssetLedger;
use crate::state::{Address, GridStatus, OrderId, OrderKey};

use super::Exchange;

impl<L: AssetLedger> Exchange<L> {
    /// Cancels every live slot of a grid and refunds its balances. Accrued
    /// profit stays withdrawable.
    pub fn cancel_grid(&mut self, owner: &Address, grid_id: u64, recipient: &Address) -> Result<()> {
        self.depth.ensure_idle()?;
        self.atomic("cancel_grid", |ex| {
            let grid = ex.owned_grid(owner, grid_id)?;
            if !grid.is_active() {
                return Err(GridError::GridCanceled);
            }
            let keys: Vec<OrderKey> = (0..grid.order_count()).map(|i| OrderKey::new(grid_id, i)).collect();
            let (base, quote) = ex.refund_slots(&keys, false)?;
            ex.grid_mut(grid_id)?.status = GridStatus::Canceled;
            ex.send_refund(grid_id, recipient, base, quote)?;
            info!(grid_id, %owner, %recipient, base, quote, "grid canceled");
            Ok(())
        })
    }

    /// Cancels selected slots of a grid. Each one must still be live.
    pub fn cancel_orders(
        &mut self,
        owner: &Address,
        grid_id: u64,
        order_ids: &[OrderId],
        recipient: &Address,
    ) -> Result<()> {
        self.depth.ensure_idle()?;
        self.atomic("cancel_orders", |ex| {
            ex.owned_grid(owner, grid_id)?;
            if order_ids.is_empty() {
                return Err(GridError::InvalidBatch);
            }
            let keys = order_ids
                .iter()
                .map(|id| {
                    let key = OrderKey::unpack(*id)?;
                    if key.grid_id != grid_id {
                        return Err(GridError::InvalidBatch);
                    }
                    Ok(key)
                })
                .collect::<Result<Vec<_>>>()?;
            let (base, quote) = ex.refund_slots(&keys, true)?;
            ex.send_refund(grid_id, recipient, base, quote)?;
            info!(grid_id, %owner, orders = keys.len(), base, quote, "orders canceled");
            Ok(())
        })
    }

    /// Pays accrued profit to `recipient`. `amount == 0` withdraws everything;
    /// larger amounts are clamped. Returns the amount paid.
    pub fn withdraw_grid_profits(
        &mut self,
        owner: &Address,
        grid_id: u64,
        amount: u64,
        recipient: &Address,
    ) -> Result<u64> {
        self.depth.ensure_idle()?;
        self.atomic("withdraw_grid_profits", |ex| {
            let grid = ex.owned_grid(owner, grid_id)?;
            if grid.profits == 0 {
                return Err(GridError::NoProfits);
            }
            let paid = if amount == 0 { grid.profits } else { amount.min(grid.profits) };
            let quote = ex.pair(grid.pair_id)?.quote;
            let grid = ex.grid_mut(grid_id)?;
            grid.profits -= paid;
            ex.send(&quote, recipient, paid)?;
            info!(grid_id, %owner, %recipient, amount = paid, "profits withdrawn");
            Ok(paid)
        })
    }

    pub fn modify_grid_fee(&mut self, owner: &Address, grid_id: u64, fee_ppm: u32) -> Result<()> {
        self.depth.ensure_idle()?;
        self.atomic("modify_grid_fee", |ex| {
            let grid = ex.owned_grid(owner, grid_id)?;
            if grid.oneshot {
                return Err(GridError::OneshotFeeImmutable);
            }
            if !ex.state.config().fee_in_bounds(fee_ppm) {
                return Err(GridError::InvalidFee);
            }
            ex.grid_mut(grid_id)?.fee_ppm = fee_ppm;
            info!(grid_id, %owner, fee_ppm, "grid fee modified");
            Ok(())
        })
    }

    /// Zeroes and cancels the given slots, returning the `(base, quote)` they held.
    /// Already-canceled slots fail when `strict`, otherwise they are skipped.
    fn refund_slots(&mut self, keys: &[OrderKey], strict: bool) -> Result<(u64, u64)> {
        let mut base_total = 0u64;
        let mut quote_total = 0u64;
        for key in keys {
            let slot = self.state.order_mut(key)?;
            if slot.canceled {
                if strict {
                    return Err(GridError::OrderCanceled);
                }
                continue;
            }
            let (base, quote) = slot.balances();
            slot.amount = 0;
            slot.reverse_amount = 0;
            slot.canceled = true;
            base_total = base_total.checked_add(base).ok_or(GridError::MathOverflow)?;
            quote_total = quote_total.checked_add(quote).ok_or(GridError::MathOverflow)?;
        }
        Ok((base_total, quote_total))
    }

    fn send_refund(&mut self, grid_id: u64, recipient: &Address, base: u64, quote: u64) -> Result<()> {
        let pair = self.pair(self.grid(grid_id)?.pair_id)?.clone();
        self.send(&pair.base, recipient, base)?;
        self.send(&pair.quote, recipient, quote)
    }
}
