//! Engine records and their undo journal.
//!
//! All writes go through [`ExchangeState`] methods that journal the value they
//! replace, so [`ExchangeState::checkpoint_revert`] only has to put back what
//! the failed call touched.

use std::collections::BTreeMap;

use crate::config::ExchangeConfig;
use crate::error::{GridError, Result};
use crate::journal::{Journal, JournalCheckpoint};
use crate::state::{Address, AssetId, GridConfig, OrderKey, OrderSlot, Pair};
use crate::strategy::{PriceStrategy, Strategy, StrategyKey, StrategyRegistry};

/// Pairs keyed by id and by `(base, quote)`. Only one orientation of two assets
/// may ever exist.
#[derive(Clone, Debug, Default)]
pub(crate) struct PairRegistry {
    pairs: BTreeMap<u64, Pair>,
    by_assets: BTreeMap<(AssetId, AssetId), u64>,
    next_id: u64,
}

impl PairRegistry {
    pub(crate) fn get(&self, pair_id: u64) -> Result<&Pair> {
        self.pairs.get(&pair_id).ok_or(GridError::PairNotFound)
    }

    fn get_mut(&mut self, pair_id: u64) -> Result<&mut Pair> {
        self.pairs.get_mut(&pair_id).ok_or(GridError::PairNotFound)
    }

    pub(crate) fn find(&self, base: &AssetId, quote: &AssetId) -> Option<u64> {
        self.by_assets.get(&(*base, *quote)).copied()
    }

    /// Returns the pair for `(base, quote)` and whether this call created it.
    fn get_or_create(&mut self, base: AssetId, quote: AssetId) -> Result<(Pair, bool)> {
        if base == quote {
            return Err(GridError::InvalidPair);
        }
        if self.by_assets.contains_key(&(quote, base)) {
            return Err(GridError::PairOrderMismatch);
        }
        if let Some(id) = self.find(&base, &quote) {
            return Ok((self.get(id)?.clone(), false));
        }
        let id = self.next_id.checked_add(1).ok_or(GridError::MathOverflow)?;
        let pair = Pair {
            id,
            base,
            quote,
            paused: false,
        };
        self.next_id = id;
        self.pairs.insert(id, pair.clone());
        self.by_assets.insert((base, quote), id);
        Ok((pair, true))
    }

    /// Undoes the creation of the newest pair.
    fn remove_created(&mut self, pair_id: u64) {
        if let Some(pair) = self.pairs.remove(&pair_id) {
            self.by_assets.remove(&(pair.base, pair.quote));
        }
        self.next_id = pair_id.saturating_sub(1);
    }
}

/// Pre-image of one write.
#[derive(Clone, Debug)]
enum StateChange {
    Paused(bool),
    NextGridId(u64),
    Config(ExchangeConfig),
    Grid {
        id: u64,
        previous: Option<GridConfig>,
    },
    Order {
        key: OrderKey,
        previous: Option<OrderSlot>,
    },
    FillFlow {
        asset: AssetId,
        previous: Option<i128>,
    },
    PairCreated(u64),
    PairPaused {
        id: u64,
        previous: bool,
    },
    StrategyInstalled(Address),
    StrategyAllowed {
        id: Address,
        previous: bool,
    },
    StrategyRegistered {
        id: Address,
        key: StrategyKey,
    },
}

#[derive(Debug)]
pub(crate) struct ExchangeState {
    config: ExchangeConfig,
    paused: bool,
    next_grid_id: u64,
    grids: BTreeMap<u64, GridConfig>,
    orders: BTreeMap<OrderKey, OrderSlot>,
    pairs: PairRegistry,
    strategies: StrategyRegistry,
    /// Cumulative change of the engine's balance per asset caused by completed
    /// fills. Settlement subtracts nested fills' movements from the payment it
    /// observes over a callback.
    fill_flows: BTreeMap<AssetId, i128>,
    journal: Journal<StateChange>,
}

impl ExchangeState {
    pub(crate) fn new(config: ExchangeConfig) -> Self {
        let strategies = StrategyRegistry::with_builtins(config.engine);
        Self {
            config,
            paused: false,
            next_grid_id: 1,
            grids: BTreeMap::new(),
            orders: BTreeMap::new(),
            pairs: PairRegistry::default(),
            strategies,
            fill_flows: BTreeMap::new(),
            journal: Journal::new(),
        }
    }

    pub(crate) fn config(&self) -> &ExchangeConfig {
        &self.config
    }

    pub(crate) fn paused(&self) -> bool {
        self.paused
    }

    pub(crate) fn grid(&self, grid_id: u64) -> Result<&GridConfig> {
        self.grids.get(&grid_id).ok_or(GridError::GridNotFound)
    }

    pub(crate) fn grids(&self) -> impl Iterator<Item = &GridConfig> {
        self.grids.values()
    }

    pub(crate) fn order(&self, key: &OrderKey) -> Result<&OrderSlot> {
        self.orders.get(key).ok_or(GridError::OrderNotFound)
    }

    pub(crate) fn pairs(&self) -> &PairRegistry {
        &self.pairs
    }

    pub(crate) fn strategies(&self) -> &StrategyRegistry {
        &self.strategies
    }

    pub(crate) fn fill_flow(&self, asset: &AssetId) -> i128 {
        self.fill_flows.get(asset).copied().unwrap_or(0)
    }

    pub(crate) fn set_paused(&mut self, paused: bool) {
        self.journal.record(StateChange::Paused(self.paused));
        self.paused = paused;
    }

    pub(crate) fn config_mut(&mut self) -> &mut ExchangeConfig {
        self.journal.record(StateChange::Config(self.config.clone()));
        &mut self.config
    }

    pub(crate) fn allocate_grid_id(&mut self) -> Result<u64> {
        let id = self.next_grid_id;
        let next = id.checked_add(1).ok_or(GridError::MathOverflow)?;
        self.journal.record(StateChange::NextGridId(id));
        self.next_grid_id = next;
        Ok(id)
    }

    pub(crate) fn insert_grid(&mut self, grid: GridConfig) {
        let id = grid.id;
        let previous = self.grids.insert(id, grid);
        self.journal.record(StateChange::Grid { id, previous });
    }

    pub(crate) fn grid_mut(&mut self, grid_id: u64) -> Result<&mut GridConfig> {
        let grid = self.grids.get_mut(&grid_id).ok_or(GridError::GridNotFound)?;
        self.journal.record(StateChange::Grid {
            id: grid_id,
            previous: Some(grid.clone()),
        });
        Ok(grid)
    }

    pub(crate) fn insert_order(&mut self, key: OrderKey, slot: OrderSlot) {
        let previous = self.orders.insert(key, slot);
        self.journal.record(StateChange::Order { key, previous });
    }

    pub(crate) fn order_mut(&mut self, key: &OrderKey) -> Result<&mut OrderSlot> {
        let slot = self.orders.get_mut(key).ok_or(GridError::OrderNotFound)?;
        self.journal.record(StateChange::Order {
            key: *key,
            previous: Some(slot.clone()),
        });
        Ok(slot)
    }

    pub(crate) fn set_fill_flow(&mut self, asset: AssetId, flow: i128) {
        let previous = self.fill_flows.insert(asset, flow);
        self.journal.record(StateChange::FillFlow { asset, previous });
    }

    pub(crate) fn pair_or_create(&mut self, base: AssetId, quote: AssetId) -> Result<Pair> {
        let (pair, created) = self.pairs.get_or_create(base, quote)?;
        if created {
            self.journal.record(StateChange::PairCreated(pair.id));
        }
        Ok(pair)
    }

    pub(crate) fn set_pair_paused(&mut self, pair_id: u64, paused: bool) -> Result<()> {
        let pair = self.pairs.get_mut(pair_id)?;
        let previous = pair.paused;
        pair.paused = paused;
        self.journal.record(StateChange::PairPaused { id: pair_id, previous });
        Ok(())
    }

    pub(crate) fn install_strategy(&mut self, id: Address, strategy: Strategy) -> Result<()> {
        self.strategies.install(id, strategy)?;
        self.journal.record(StateChange::StrategyInstalled(id));
        Ok(())
    }

    pub(crate) fn set_strategy_allowed(&mut self, id: Address, allowed: bool) -> Result<()> {
        let previous = self.strategies.set_allowed(id, allowed)?;
        self.journal.record(StateChange::StrategyAllowed { id, previous });
        Ok(())
    }

    /// Stores a grid side's ladder parameters with an allowlisted strategy.
    pub(crate) fn register_grid_strategy(
        &mut self,
        id: Address,
        engine: &Address,
        key: StrategyKey,
        data: &[u8],
    ) -> Result<()> {
        self.strategies
            .allowed_mut(&id)?
            .create_grid_strategy(engine, key, data)?;
        self.journal.record(StateChange::StrategyRegistered { id, key });
        Ok(())
    }

    pub(crate) fn checkpoint(&mut self) -> JournalCheckpoint {
        self.journal.checkpoint()
    }

    pub(crate) fn checkpoint_commit(&mut self, checkpoint: JournalCheckpoint) {
        self.journal.commit(checkpoint);
    }

    pub(crate) fn checkpoint_revert(&mut self, checkpoint: JournalCheckpoint) {
        for change in self.journal.revert(checkpoint) {
            match change {
                StateChange::Paused(paused) => self.paused = paused,
                StateChange::NextGridId(id) => self.next_grid_id = id,
                StateChange::Config(config) => self.config = config,
                StateChange::Grid { id, previous } => restore(&mut self.grids, id, previous),
                StateChange::Order { key, previous } => restore(&mut self.orders, key, previous),
                StateChange::FillFlow { asset, previous } => restore(&mut self.fill_flows, asset, previous),
                StateChange::PairCreated(id) => self.pairs.remove_created(id),
                StateChange::PairPaused { id, previous } => {
                    if let Ok(pair) = self.pairs.get_mut(id) {
                        pair.paused = previous;
                    }
                }
                StateChange::StrategyInstalled(id) => self.strategies.uninstall(&id),
                StateChange::StrategyAllowed { id, previous } => {
                    let _ = self.strategies.set_allowed(id, previous);
                }
                StateChange::StrategyRegistered { id, key } => self.strategies.forget_grid_strategy(&id, key),
            }
        }
    }

    /// Undo entries held for the checkpoints still open.
    pub(crate) fn journal_len(&self) -> usize {
        self.journal.len()
    }
}

fn restore<K: Ord, V>(map: &mut BTreeMap<K, V>, key: K, previous: Option<V>) {
    match previous {
        Some(value) => {
            map.insert(key, value);
        }
        None => {
            map.remove(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::LinearParams;
    use crate::state::{GridStatus, Side};
    use crate::strategy::LINEAR_STRATEGY_ID;

    const BASE: AssetId = AssetId::Token(Address::repeat_byte(0xba));
    const QUOTE: AssetId = AssetId::Token(Address::repeat_byte(0x9e));
    const ENGINE: Address = Address::repeat_byte(0xee);

    fn state() -> ExchangeState {
        ExchangeState::new(ExchangeConfig::new(
            Address::repeat_byte(0xad),
            ENGINE,
            Address::repeat_byte(0xfa),
        ))
    }

    fn grid(id: u64, pair_id: u64) -> GridConfig {
        GridConfig {
            id,
            owner: Address::repeat_byte(1),
            pair_id,
            ask_strategy: LINEAR_STRATEGY_ID,
            bid_strategy: LINEAR_STRATEGY_ID,
            fee_ppm: 500,
            ask_count: 1,
            bid_count: 0,
            base_amount: 1_000,
            compound: false,
            oneshot: false,
            status: GridStatus::Active,
            profits: 0,
        }
    }

    #[test]
    fn test_pair_registry_reuses_pair() {
        let mut pairs = PairRegistry::default();
        let (pair, created) = pairs.get_or_create(BASE, QUOTE).expect("create");
        assert_eq!(pair.id, 1);
        assert!(created);
        let (again, created) = pairs.get_or_create(BASE, QUOTE).expect("reuse");
        assert_eq!(again.id, pair.id);
        assert!(!created);
        assert_eq!(pairs.find(&BASE, &QUOTE), Some(pair.id));
    }

    #[test]
    fn test_pair_registry_enforces_canonical_order() {
        let mut pairs = PairRegistry::default();
        pairs.get_or_create(BASE, QUOTE).expect("create");
        assert_eq!(
            pairs.get_or_create(QUOTE, BASE).expect_err("must fail"),
            GridError::PairOrderMismatch
        );
        assert_eq!(pairs.get_or_create(BASE, BASE).expect_err("must fail"), GridError::InvalidPair);
    }

    #[test]
    fn test_revert_restores_only_touched_records() {
        let mut state = state();
        let pair = state.pair_or_create(BASE, QUOTE).expect("pair");
        let kept = state.allocate_grid_id().expect("id");
        state.insert_grid(grid(kept, pair.id));
        let key = OrderKey::new(kept, 0);
        state.insert_order(key, OrderSlot::new(Side::Ask, 1_000, false));
        assert_eq!(state.journal_len(), 0);
        let oneshot_fee = state.config().oneshot_fee_ppm;

        let cp = state.checkpoint();
        state.grid_mut(kept).expect("grid").profits = 7;
        state.order_mut(&key).expect("order").amount = 1;
        state.set_fill_flow(BASE, -5);
        let fresh = state.allocate_grid_id().expect("id");
        state.insert_grid(grid(fresh, pair.id));
        let other = state.pair_or_create(QUOTE, AssetId::Native).expect("pair");
        let data = LinearParams {
            price0: 1_000_000_000,
            gap: 1_000,
        }
        .encode()
        .expect("encode");
        state
            .register_grid_strategy(LINEAR_STRATEGY_ID, &ENGINE, StrategyKey::new(fresh, Side::Ask), &data)
            .expect("register");
        state.config_mut().oneshot_fee_ppm = oneshot_fee + 1;
        state.set_paused(true);
        assert_eq!(state.journal_len(), 9);
        state.checkpoint_revert(cp);

        assert_eq!(state.grid(kept).expect("grid").profits, 0);
        assert_eq!(state.order(&key).expect("order").amount, 1_000);
        assert_eq!(state.fill_flow(&BASE), 0);
        assert_eq!(state.grid(fresh).expect_err("gone"), GridError::GridNotFound);
        assert_eq!(state.allocate_grid_id().expect("id"), fresh);
        assert_eq!(state.pairs().get(other.id).expect_err("gone"), GridError::PairNotFound);
        assert_eq!(state.pairs().find(&QUOTE, &AssetId::Native), None);
        assert_eq!(
            state
                .strategies()
                .get(&LINEAR_STRATEGY_ID)
                .expect("installed")
                .price_at(StrategyKey::new(fresh, Side::Ask), 0)
                .expect_err("forgotten"),
            GridError::GridNotFound
        );
        assert_eq!(state.config().oneshot_fee_ppm, oneshot_fee);
        assert!(!state.paused());
        assert_eq!(state.journal_len(), 0);
    }

    #[test]
    fn test_nested_revert_keeps_outer_writes() {
        let mut state = state();
        let outer = state.checkpoint();
        state.set_pair_paused(1, true).expect_err("no pair yet");
        let pair = state.pair_or_create(BASE, QUOTE).expect("pair");

        let inner = state.checkpoint();
        state.set_pair_paused(pair.id, true).expect("pause");
        state.set_strategy_allowed(LINEAR_STRATEGY_ID, false).expect("disallow");
        state.checkpoint_revert(inner);
        assert!(!state.pairs().get(pair.id).expect("pair").paused);
        assert!(state.strategies().is_allowed(&LINEAR_STRATEGY_ID));

        state.checkpoint_commit(outer);
        assert_eq!(state.pairs().find(&BASE, &QUOTE), Some(pair.id));
        assert_eq!(state.journal_len(), 0);
    }
}
