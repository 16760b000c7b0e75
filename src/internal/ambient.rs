//! Ambient scope slot for the tracking scope variant.
//!
//! When a provider runs with [`ScopeMode::Tracking`](crate::ScopeMode),
//! the innermost live tracked scope publishes its scoped cache here so
//! nested resolutions on the same thread transparently share it. The
//! slot is strictly thread-local; scopes never migrate across threads.

use std::cell::RefCell;

use crate::provider::SharedScopedCache;

thread_local! {
    static AMBIENT: RefCell<Vec<SharedScopedCache>> = RefCell::new(Vec::new());
}

pub(crate) fn push_ambient(cache: SharedScopedCache) {
    AMBIENT.with(|slot| slot.borrow_mut().push(cache));
}

pub(crate) fn pop_ambient() {
    AMBIENT.with(|slot| {
        slot.borrow_mut().pop();
    });
}

pub(crate) fn ambient_scope() -> Option<SharedScopedCache> {
    AMBIENT.with(|slot| slot.borrow().last().cloned())
}
