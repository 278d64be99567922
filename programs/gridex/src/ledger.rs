//! Asset ledger consumed by the engine.

use std::collections::BTreeMap;

use crate::error::LedgerError;
use crate::journal::{Journal, JournalCheckpoint};
use crate::state::{Address, AssetId};

/// Balances of every asset the engine touches, native coin included.
///
/// `transfer` moves funds owned by `from`; `transfer_from` moves funds owned by
/// `holder` on behalf of `spender` and consumes allowance. Any error aborts the
/// enclosing engine call.
///
/// The engine opens a checkpoint around every call and reverts it when the call
/// fails, so a ledger must be able to undo balance and allowance changes made
/// since any open checkpoint. Checkpoints nest.
pub trait AssetLedger {
    fn balance_of(&self, asset: &AssetId, holder: &Address) -> u64;

    fn transfer(&mut self, asset: &AssetId, from: &Address, to: &Address, amount: u64) -> Result<(), LedgerError>;

    fn transfer_from(
        &mut self,
        asset: &AssetId,
        spender: &Address,
        holder: &Address,
        to: &Address,
        amount: u64,
    ) -> Result<(), LedgerError>;

    fn checkpoint(&mut self) -> JournalCheckpoint;

    fn checkpoint_commit(&mut self, checkpoint: JournalCheckpoint);

    fn checkpoint_revert(&mut self, checkpoint: JournalCheckpoint);
}

#[derive(Clone, Debug)]
enum LedgerChange {
    Balance {
        key: (AssetId, Address),
        previous: u64,
    },
    Allowance {
        key: (AssetId, Address, Address),
        previous: u64,
    },
}

#[derive(Clone, Debug, Default)]
pub struct InMemoryLedger {
    balances: BTreeMap<(AssetId, Address), u64>,
    allowances: BTreeMap<(AssetId, Address, Address), u64>,
    journal: Journal<LedgerChange>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mint(&mut self, asset: AssetId, to: Address, amount: u64) -> Result<(), LedgerError> {
        let balance = self.balance_of(&asset, &to);
        self.set_balance((asset, to), balance.checked_add(amount).ok_or(LedgerError::Overflow)?);
        Ok(())
    }

    pub fn approve(&mut self, asset: AssetId, holder: Address, spender: Address, amount: u64) {
        self.set_allowance((asset, holder, spender), amount);
    }

    pub fn allowance(&self, asset: &AssetId, holder: &Address, spender: &Address) -> u64 {
        self.allowances.get(&(*asset, *holder, *spender)).copied().unwrap_or(0)
    }

    /// Sum of all balances of `asset`.
    pub fn total_supply(&self, asset: &AssetId) -> u128 {
        self.balances
            .iter()
            .filter(|((a, _), _)| a == asset)
            .map(|(_, v)| *v as u128)
            .sum()
    }

    fn move_balance(&mut self, asset: &AssetId, from: &Address, to: &Address, amount: u64) -> Result<(), LedgerError> {
        let available = self.balance_of(asset, from);
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                available,
                required: amount,
            });
        }
        if from == to {
            return Ok(());
        }
        let dest = self.balance_of(asset, to);
        let new_dest = dest.checked_add(amount).ok_or(LedgerError::Overflow)?;
        self.set_balance((*asset, *from), available - amount);
        self.set_balance((*asset, *to), new_dest);
        Ok(())
    }

    fn set_balance(&mut self, key: (AssetId, Address), value: u64) {
        let previous = self.balances.insert(key, value).unwrap_or(0);
        self.journal.record(LedgerChange::Balance { key, previous });
    }

    fn set_allowance(&mut self, key: (AssetId, Address, Address), value: u64) {
        let previous = self.allowances.insert(key, value).unwrap_or(0);
        self.journal.record(LedgerChange::Allowance { key, previous });
    }
}

impl AssetLedger for InMemoryLedger {
    fn balance_of(&self, asset: &AssetId, holder: &Address) -> u64 {
        self.balances.get(&(*asset, *holder)).copied().unwrap_or(0)
    }

    fn transfer(&mut self, asset: &AssetId, from: &Address, to: &Address, amount: u64) -> Result<(), LedgerError> {
        self.move_balance(asset, from, to, amount)
    }

    fn transfer_from(
        &mut self,
        asset: &AssetId,
        spender: &Address,
        holder: &Address,
        to: &Address,
        amount: u64,
    ) -> Result<(), LedgerError> {
        let allowance = self.allowance(asset, holder, spender);
        if allowance < amount {
            return Err(LedgerError::InsufficientAllowance {
                available: allowance,
                required: amount,
            });
        }
        self.move_balance(asset, holder, to, amount)?;
        self.set_allowance((*asset, *holder, *spender), allowance - amount);
        Ok(())
    }

    fn checkpoint(&mut self) -> JournalCheckpoint {
        self.journal.checkpoint()
    }

    fn checkpoint_commit(&mut self, checkpoint: JournalCheckpoint) {
        self.journal.commit(checkpoint);
    }

    fn checkpoint_revert(&mut self, checkpoint: JournalCheckpoint) {
        for change in self.journal.revert(checkpoint) {
            match change {
                LedgerChange::Balance { key, previous } => {
                    self.balances.insert(key, previous);
                }
                LedgerChange::Allowance { key, previous } => {
                    self.allowances.insert(key, previous);
                }
            }
        }
    }
}
