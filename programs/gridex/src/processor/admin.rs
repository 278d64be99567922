use tracing::info;

use crate::constants::{BPS_DENOMINATOR, FEE_DENOMINATOR};
use crate::error::{GridError, Result};
use crate::ledger::AssetLedger;
use crate::state::Address;
use crate::strategy::Strategy;

use super::Exchange;

impl<L: AssetLedger> Exchange<L> {
    fn admin_call<T>(
        &mut self,
        caller: &Address,
        op: &'static str,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        self.depth.ensure_idle()?;
        if *caller != self.state.config().admin {
            return Err(GridError::NotAdmin);
        }
        self.atomic(op, f)
    }

    pub fn set_paused(&mut self, caller: &Address, paused: bool) -> Result<()> {
        self.admin_call(caller, "set_paused", |ex| {
            ex.state.set_paused(paused);
            info!(paused, "exchange pause updated");
            Ok(())
        })
    }

    pub fn set_pair_paused(&mut self, caller: &Address, pair_id: u64, paused: bool) -> Result<()> {
        self.admin_call(caller, "set_pair_paused", |ex| {
            ex.state.set_pair_paused(pair_id, paused)?;
            info!(pair_id, paused, "pair pause updated");
            Ok(())
        })
    }

    pub fn set_protocol_fee_share(&mut self, caller: &Address, share_bps: u16) -> Result<()> {
        self.admin_call(caller, "set_protocol_fee_share", |ex| {
            if share_bps as u64 > BPS_DENOMINATOR {
                return Err(GridError::InvalidFee);
            }
            ex.state.config_mut().protocol_fee_share_bps = share_bps;
            info!(share_bps, "protocol fee share updated");
            Ok(())
        })
    }

    /// Sets the fee charged by oneshot grids, including ones already placed.
    pub fn set_oneshot_fee(&mut self, caller: &Address, fee_ppm: u32) -> Result<()> {
        self.admin_call(caller, "set_oneshot_fee", |ex| {
            if fee_ppm as u64 > FEE_DENOMINATOR {
                return Err(GridError::InvalidFee);
            }
            ex.state.config_mut().oneshot_fee_ppm = fee_ppm;
            let oneshot: Vec<u64> = ex.state.grids().filter(|g| g.oneshot).map(|g| g.id).collect();
            for grid_id in oneshot {
                ex.state.grid_mut(grid_id)?.fee_ppm = fee_ppm;
            }
            info!(fee_ppm, "oneshot fee updated");
            Ok(())
        })
    }

    /// Bounds apply to new grids and fee changes; existing fees are untouched.
    pub fn set_fee_bounds(&mut self, caller: &Address, min_fee_ppm: u32, max_fee_ppm: u32) -> Result<()> {
        self.admin_call(caller, "set_fee_bounds", |ex| {
            if min_fee_ppm > max_fee_ppm || max_fee_ppm as u64 > FEE_DENOMINATOR {
                return Err(GridError::InvalidFee);
            }
            let config = ex.state.config_mut();
            config.min_fee_ppm = min_fee_ppm;
            config.max_fee_ppm = max_fee_ppm;
            info!(min_fee_ppm, max_fee_ppm, "fee bounds updated");
            Ok(())
        })
    }

    /// Installs a strategy under `id`. It stays unusable for new grids until allowed.
    pub fn install_strategy(&mut self, caller: &Address, id: Address, strategy: Strategy) -> Result<()> {
        self.admin_call(caller, "install_strategy", |ex| {
            ex.state.install_strategy(id, strategy)?;
            info!(%id, "strategy installed");
            Ok(())
        })
    }

    pub fn set_strategy_allowed(&mut self, caller: &Address, id: Address, allowed: bool) -> Result<()> {
        self.admin_call(caller, "set_strategy_allowed", |ex| {
            ex.state.set_strategy_allowed(id, allowed)?;
            info!(%id, allowed, "strategy allowlist updated");
            Ok(())
        })
    }
}
