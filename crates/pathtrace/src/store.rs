//! Context stores: where the current state of each named context lives.
//!
//! A store only swaps one immutable [`TraceState`] for its successor. It
//! never aggregates anything itself.

use parking_lot::Mutex;
use pathtrace_core::TraceState;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Slot store holding one current state per context id.
pub trait ContextStore {
    /// Current state of `context`, storing `create()` first if it has none.
    fn get_or_insert_with(&self, context: &str, create: &dyn Fn() -> TraceState) -> TraceState;

    /// Replace the current state of `context`.
    fn set(&self, context: &str, state: TraceState);

    /// Forget every context visible through this store.
    fn clear_all(&self);

    /// Context ids that currently hold a state.
    fn contexts(&self) -> Vec<String>;
}

thread_local! {
    static THREAD_CONTEXTS: RefCell<HashMap<String, TraceState>> = RefCell::new(HashMap::new());
}

/// Per-OS-thread store. Every `ThreadLocalStore` on a thread sees the same
/// contexts; other threads see their own.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadLocalStore;

impl ContextStore for ThreadLocalStore {
    fn get_or_insert_with(&self, context: &str, create: &dyn Fn() -> TraceState) -> TraceState {
        let existing = THREAD_CONTEXTS.with(|contexts| contexts.borrow().get(context).cloned());
        if let Some(state) = existing {
            return state;
        }
        // No borrow is held while `create` runs
        let created = create();
        THREAD_CONTEXTS.with(|contexts| {
            contexts
                .borrow_mut()
                .entry(context.to_string())
                .or_insert(created)
                .clone()
        })
    }

    fn set(&self, context: &str, state: TraceState) {
        THREAD_CONTEXTS.with(|contexts| {
            contexts.borrow_mut().insert(context.to_string(), state);
        });
    }

    fn clear_all(&self) {
        THREAD_CONTEXTS.with(|contexts| contexts.borrow_mut().clear());
    }

    fn contexts(&self) -> Vec<String> {
        THREAD_CONTEXTS.with(|contexts| {
            let mut ids: Vec<String> = contexts.borrow().keys().cloned().collect();
            ids.sort();
            ids
        })
    }
}

/// Identifier of a logical execution unit (a task, a request, a fiber).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExecutionUnitId(Uuid);

impl ExecutionUnitId {
    /// Fresh random id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Id from a fixed value, for deterministic tests
    pub const fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }

    /// Underlying UUID
    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ExecutionUnitId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ExecutionUnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unit-{}", self.0)
    }
}

type UnitContexts = HashMap<ExecutionUnitId, HashMap<String, TraceState>>;

/// Store shared across threads, partitioned by [`ExecutionUnitId`].
///
/// Use this where "current thread" is not a stable isolation unit, e.g.
/// tasks that migrate between worker threads.
#[derive(Debug, Clone, Default)]
pub struct ScopedStore {
    units: Arc<Mutex<UnitContexts>>,
}

impl ScopedStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// View of the contexts belonging to `unit`.
    pub fn scope(&self, unit: ExecutionUnitId) -> UnitScope {
        UnitScope {
            unit,
            units: Arc::clone(&self.units),
        }
    }

    /// Units that currently hold at least one context
    pub fn units(&self) -> Vec<ExecutionUnitId> {
        let mut units: Vec<ExecutionUnitId> = self
            .units
            .lock()
            .iter()
            .filter(|(_, contexts)| !contexts.is_empty())
            .map(|(unit, _)| *unit)
            .collect();
        units.sort();
        units
    }

    /// Drop every context of `unit`.
    pub fn remove_unit(&self, unit: ExecutionUnitId) {
        self.units.lock().remove(&unit);
    }
}

/// The slice of a [`ScopedStore`] owned by one execution unit.
#[derive(Debug, Clone)]
pub struct UnitScope {
    unit: ExecutionUnitId,
    units: Arc<Mutex<UnitContexts>>,
}

impl UnitScope {
    /// Unit this scope belongs to
    pub fn unit(&self) -> ExecutionUnitId {
        self.unit
    }
}

impl ContextStore for UnitScope {
    fn get_or_insert_with(&self, context: &str, create: &dyn Fn() -> TraceState) -> TraceState {
        let existing = self
            .units
            .lock()
            .get(&self.unit)
            .and_then(|contexts| contexts.get(context).cloned());
        if let Some(state) = existing {
            return state;
        }
        // Created unlocked; a racing insert for the same context wins
        let created = create();
        self.units
            .lock()
            .entry(self.unit)
            .or_default()
            .entry(context.to_string())
            .or_insert(created)
            .clone()
    }

    fn set(&self, context: &str, state: TraceState) {
        self.units
            .lock()
            .entry(self.unit)
            .or_default()
            .insert(context.to_string(), state);
    }

    fn clear_all(&self) {
        self.units.lock().remove(&self.unit);
    }

    fn contexts(&self) -> Vec<String> {
        let units = self.units.lock();
        let mut ids: Vec<String> = units
            .get(&self.unit)
            .map(|contexts| contexts.keys().cloned().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_thread_local_store_is_per_thread() {
        let store = ThreadLocalStore;
        store.clear_all();
        let state = TraceState::root().push("main").unwrap();
        store.set("ctx", state.clone());
        assert_eq!(store.get_or_insert_with("ctx", &TraceState::root), state);

        let seen = thread::spawn(|| ThreadLocalStore.contexts()).join().unwrap();
        assert!(seen.is_empty());
        assert_eq!(store.contexts(), vec!["ctx".to_string()]);

        store.clear_all();
        assert!(store.contexts().is_empty());
    }

    #[test]
    fn test_get_or_insert_with_creates_once() {
        let store = ScopedStore::new().scope(ExecutionUnitId::from_u128(1));
        let first = store.get_or_insert_with("ctx", &TraceState::root);
        let second = store.get_or_insert_with("ctx", &|| {
            TraceState::root().push("never stored").unwrap()
        });
        assert!(first.is_root());
        assert!(second.is_root());
        assert!(pathtrace_core::AggregateTable::ptr_eq(
            first.aggregate_table(),
            second.aggregate_table()
        ));
    }

    #[test]
    fn test_thread_local_create_may_read_store() {
        let store = ThreadLocalStore;
        store.clear_all();
        store.set("other", TraceState::root());
        let state = store.get_or_insert_with("ctx", &|| {
            assert_eq!(ThreadLocalStore.contexts(), vec!["other".to_string()]);
            TraceState::root().push("created").unwrap()
        });
        assert_eq!(state.current_segment_name().unwrap(), "created");
        assert_eq!(store.contexts(), vec!["ctx".to_string(), "other".to_string()]);
        store.clear_all();
    }

    #[test]
    fn test_unit_scope_create_may_read_store() {
        let store = ScopedStore::new();
        let scope = store.scope(ExecutionUnitId::from_u128(7));
        let state = scope.get_or_insert_with("ctx", &|| {
            assert!(scope.contexts().is_empty());
            assert!(store.units().is_empty());
            TraceState::root().push("created").unwrap()
        });
        assert_eq!(state.current_segment_name().unwrap(), "created");
        assert_eq!(scope.contexts(), vec!["ctx".to_string()]);
    }

    #[test]
    fn test_scoped_units_are_isolated() {
        let store = ScopedStore::new();
        let a = store.scope(ExecutionUnitId::from_u128(1));
        let b = store.scope(ExecutionUnitId::from_u128(2));

        a.set("ctx", TraceState::root().push("in a").unwrap());
        assert_eq!(b.get_or_insert_with("ctx", &TraceState::root).depth(), 0);
        assert_eq!(a.get_or_insert_with("ctx", &TraceState::root).depth(), 1);
        assert_eq!(store.units().len(), 2);

        a.clear_all();
        assert!(a.contexts().is_empty());
        assert_eq!(b.contexts(), vec!["ctx".to_string()]);

        store.remove_unit(b.unit());
        assert!(store.units().is_empty());
    }

    #[test]
    fn test_scoped_store_crosses_threads() {
        let store = ScopedStore::new();
        let unit = ExecutionUnitId::new();
        let scope = store.scope(unit);
        thread::spawn(move || {
            scope.set("ctx", TraceState::root().push("worker").unwrap());
        })
        .join()
        .unwrap();

        let state = store.scope(unit).get_or_insert_with("ctx", &TraceState::root);
        assert_eq!(state.current_segment_name().unwrap(), "worker");
    }
}
