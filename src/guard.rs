//! Debug-only exclusivity guard.
//!
//! `ChainMap` probes buckets with user-supplied `Eq`/`Hash` code while its
//! internals may be mid-mutation. The guard catches accidental reentry from
//! that user code during development: entering a second time before the
//! first guard drops panics in debug builds. Release builds compile the
//! whole thing to nothing.

use core::cell::Cell;
use core::marker::PhantomData;

/// Tracks whether the owning structure is currently inside a guarded
/// operation. Embed one per structure and open each public entry point with
/// `let _g = self.guard.enter();`.
#[derive(Debug)]
pub(crate) struct DebugExclusive {
    #[cfg(debug_assertions)]
    active: Cell<bool>,
    // Raw-pointer marker keeps the owning structure !Send + !Sync, matching
    // the single-threaded contract.
    _nosend: PhantomData<*mut ()>,
}

impl DebugExclusive {
    pub(crate) const fn new() -> Self {
        Self {
            #[cfg(debug_assertions)]
            active: Cell::new(false),
            _nosend: PhantomData,
        }
    }

    /// Open a guarded section; the returned token closes it on drop. Panics
    /// in debug builds when a section is already open.
    #[inline]
    pub(crate) fn enter(&self) -> ExclusiveToken<'_> {
        #[cfg(debug_assertions)]
        {
            assert!(
                !self.active.replace(true),
                "reentrant use of ChainMap from user Eq/Hash code"
            );
            return ExclusiveToken { owner: self };
        }

        #[cfg(not(debug_assertions))]
        {
            return ExclusiveToken { _life: PhantomData };
        }
    }
}

pub(crate) struct ExclusiveToken<'a> {
    #[cfg(debug_assertions)]
    owner: &'a DebugExclusive,
    #[cfg(not(debug_assertions))]
    _life: PhantomData<&'a ()>,
}

impl Drop for ExclusiveToken<'_> {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        self.owner.active.set(false);
    }
}
