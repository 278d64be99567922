//! Pay-after-receive settlement.
//!
//! The engine sends the taker's output first, then either pulls the owed asset
//! or hands control to a [`FillCallback`] that must pay the engine before it
//! returns. Payment is checked against the engine's balance, net of whatever
//! nested fills moved while the callback ran.

use tracing::trace;

use crate::error::{GridError, Result};
use crate::ledger::AssetLedger;
use crate::processor::Exchange;
use crate::state::{Address, AssetId, Pair};

/// What a settlement callback is told about the payment it owes.
#[derive(Clone, Copy, Debug)]
pub struct FillCallbackContext<'a> {
    pub payer: Address,
    /// Asset the engine expects to receive.
    pub owed_asset: AssetId,
    /// Asset already sent to the taker.
    pub counterparty_asset: AssetId,
    pub owed_amount: u64,
    pub amount_sent: u64,
    pub payload: &'a [u8],
}

/// Receiver of the settlement callback.
///
/// The callback may fill other orders on `exchange` (nested fills are allowed)
/// and must pay `ctx.owed_amount` of `ctx.owed_asset` through
/// [`Exchange::pay`] before it returns. It has no other way to move funds: the
/// raw ledger is locked while a fill is in progress.
pub trait FillCallback<L> {
    fn grid_fill_callback(&mut self, exchange: &mut Exchange<L>, ctx: &FillCallbackContext<'_>) -> Result<()>;
}

impl<L, F> FillCallback<L> for F
where
    F: FnMut(&mut Exchange<L>, &FillCallbackContext<'_>) -> Result<()>,
{
    fn grid_fill_callback(&mut self, exchange: &mut Exchange<L>, ctx: &FillCallbackContext<'_>) -> Result<()> {
        self(exchange, ctx)
    }
}

/// How the taker pays for a fill.
pub enum Settle<'a, L> {
    /// Pull the owed amount with `transfer_from`; the taker must have approved
    /// the engine.
    Pull,
    Callback {
        handler: &'a mut dyn FillCallback<L>,
        payload: &'a [u8],
    },
}

impl<'a, L> Settle<'a, L> {
    pub fn callback(handler: &'a mut dyn FillCallback<L>, payload: &'a [u8]) -> Self {
        Settle::Callback { handler, payload }
    }
}

/// Native coin attached to a call and not yet spent.
#[derive(Debug)]
pub(crate) struct NativeCredit {
    payer: Address,
    remaining: u64,
}

impl NativeCredit {
    /// Moves `value` from `payer` into the engine. Only pairs with a native leg
    /// accept attached value.
    pub(crate) fn deposit<L: AssetLedger>(
        exchange: &mut Exchange<L>,
        payer: Address,
        value: u64,
        pair: &Pair,
    ) -> Result<Self> {
        if value > 0 {
            if !pair.has_native_leg() {
                return Err(GridError::InvalidNativeValue);
            }
            let engine = exchange.address();
            exchange
                .ledger
                .transfer(&AssetId::Native, &payer, &engine, value)
                .map_err(|_| GridError::NativeTransferFailed)?;
            trace!(%payer, value, "native value deposited");
        }
        Ok(Self {
            payer,
            remaining: value,
        })
    }

    /// Covers as much of `owed` as possible and returns what is still owed.
    pub(crate) fn consume(&mut self, asset: &AssetId, owed: u64) -> u64 {
        if !asset.is_native() {
            return owed;
        }
        let used = self.remaining.min(owed);
        self.remaining -= used;
        owed - used
    }

    pub(crate) fn refund<L: AssetLedger>(self, exchange: &mut Exchange<L>) -> Result<()> {
        if self.remaining > 0 {
            trace!(payer = %self.payer, amount = self.remaining, "native value refunded");
        }
        exchange.send(&AssetId::Native, &self.payer, self.remaining)
    }
}

/// Settlement leg of one fill call.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Payment {
    pub(crate) out_asset: AssetId,
    pub(crate) out_amount: u64,
    pub(crate) owed_asset: AssetId,
    pub(crate) owed_amount: u64,
}

impl<L: AssetLedger> Exchange<L> {
    /// Pays the engine on behalf of the taker whose settlement callback is
    /// running, drawing on the allowance that taker granted the engine. Only
    /// the innermost callback's taker can be debited.
    pub fn pay(&mut self, asset: &AssetId, amount: u64) -> Result<()> {
        let payer = *self.payers.last().ok_or(GridError::NoActiveSettlement)?;
        if payer == self.address() {
            return Err(GridError::Unauthorized);
        }
        self.pull(asset, &payer, amount)?;
        trace!(%payer, %asset, amount, "callback payment");
        Ok(())
    }

    /// Sends the output, collects payment and verifies it.
    pub(crate) fn settle(
        &mut self,
        taker: &Address,
        payment: Payment,
        settle: Settle<'_, L>,
        credit: &mut NativeCredit,
    ) -> Result<()> {
        self.send(&payment.out_asset, taker, payment.out_amount)?;
        trace!(%taker, asset = %payment.out_asset, amount = payment.out_amount, "output sent");

        let required = credit.consume(&payment.owed_asset, payment.owed_amount);
        if required == 0 {
            return Ok(());
        }

        let balance_before = self.engine_balance(&payment.owed_asset);
        let flow_before = self.fill_flow(&payment.owed_asset);
        match settle {
            Settle::Pull => self.pull(&payment.owed_asset, taker, required)?,
            Settle::Callback { handler, payload } => {
                let ctx = FillCallbackContext {
                    payer: *taker,
                    owed_asset: payment.owed_asset,
                    counterparty_asset: payment.out_asset,
                    owed_amount: required,
                    amount_sent: payment.out_amount,
                    payload,
                };
                trace!(%taker, owed = required, depth = self.depth.get(), "invoking fill callback");
                self.payers.push(*taker);
                let result = handler.grid_fill_callback(self, &ctx);
                self.payers.pop();
                result?;
            }
        }
        let balance_after = self.engine_balance(&payment.owed_asset);
        let nested = self.fill_flow(&payment.owed_asset) - flow_before;

        let received = balance_after as i128 - balance_before as i128 - nested;
        if received < required as i128 {
            return Err(GridError::InsufficientPayment);
        }
        trace!(%taker, received, required, "payment verified");
        Ok(())
    }
}
