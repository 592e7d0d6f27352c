//! Process-wide graphics library state shared by every canvas.
//!
//! The first lease initializes the library, the last one shuts it down. Leases are only taken
//! by backends; nothing initializes the context implicitly.

use std::sync::{Mutex, PoisonError};

use crate::foundation::error::GpuPortResult;

struct ContextState {
    leases: usize,
    generation: u64,
}

static CONTEXT: Mutex<ContextState> = Mutex::new(ContextState {
    leases: 0,
    generation: 0,
});

fn state() -> std::sync::MutexGuard<'static, ContextState> {
    CONTEXT.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Reference-counted, lazily initialized graphics library context.
pub struct GraphicsContext;

impl GraphicsContext {
    /// Take a lease, initializing the context if no other lease is live.
    pub fn acquire(owner: &str) -> GpuPortResult<ContextLease> {
        let mut st = state();
        if st.leases == 0 {
            st.generation += 1;
            tracing::debug!(owner, generation = st.generation, "graphics context init");
        }
        st.leases += 1;
        Ok(ContextLease {
            owner: owner.to_string(),
            released: false,
        })
    }

    /// Number of live leases.
    pub fn lease_count() -> usize {
        state().leases
    }

    /// Whether at least one lease is live.
    pub fn is_initialized() -> bool {
        Self::lease_count() > 0
    }

    /// How many times the context has been initialized in this process.
    pub fn generation() -> u64 {
        state().generation
    }
}

/// A live claim on the [`GraphicsContext`]; released explicitly or on drop.
#[derive(Debug)]
pub struct ContextLease {
    owner: String,
    released: bool,
}

impl ContextLease {
    /// Name given at acquire time.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Give the lease back now.
    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        let mut st = state();
        st.leases = st.leases.saturating_sub(1);
        if st.leases == 0 {
            tracing::debug!(owner = %self.owner, "graphics context shutdown");
        }
    }
}

impl Drop for ContextLease {
    fn drop(&mut self) {
        self.release_inner();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/context.rs"]
mod tests;
