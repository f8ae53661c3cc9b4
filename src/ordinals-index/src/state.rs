use std::cell::RefCell;

use ic_stable_structures::DefaultMemoryImpl;

use crate::index::OrdinalsIndex;

thread_local! {
    static INDEX: RefCell<OrdinalsIndex<DefaultMemoryImpl>> = RefCell::new(OrdinalsIndex::default());
}

/// Runs `f` over the index backed by the canister stable memory.
pub fn with_index<R>(f: impl FnOnce(&OrdinalsIndex<DefaultMemoryImpl>) -> R) -> R {
    INDEX.with(|index| f(&index.borrow()))
}

/// Runs `f` over the mutable index backed by the canister stable memory.
pub fn with_index_mut<R>(f: impl FnOnce(&mut OrdinalsIndex<DefaultMemoryImpl>) -> R) -> R {
    INDEX.with(|index| f(&mut index.borrow_mut()))
}
