//! Optimistic toggles with rollback.
//!
//! A toggle (like, follow, join, notifications) is applied locally before
//! the request goes out. A confirmed response may carry authoritative
//! values that replace the local guess; any failure puts back exactly what
//! was there before the click.
//!
//! Overlapping toggles on the same cell are not queued. Each run captures
//! whatever the cell held when it started, and whichever response lands
//! last decides what the cell ends up showing.

use std::future::Future;
use std::sync::{Arc, Mutex};

use uuid::Uuid;

use crate::error::{normalize_message, ApiResult};

/// A flag and the counter that moves with it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ToggleState {
    pub active: bool,
    pub count: u64,
}

impl ToggleState {
    pub fn new(active: bool, count: u64) -> Self {
        Self { active, count }
    }

    /// Flip the flag and move the counter with it. Never goes below zero.
    pub fn toggled(self) -> Self {
        if self.active {
            Self {
                active: false,
                count: self.count.saturating_sub(1),
            }
        } else {
            Self {
                active: true,
                count: self.count.saturating_add(1),
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ToggleCell {
    state: Arc<Mutex<ToggleState>>,
}

impl ToggleCell {
    pub fn new(state: ToggleState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn get(&self) -> ToggleState {
        match self.state.lock() {
            Ok(state) => *state,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    pub fn set(&self, value: ToggleState) {
        self.update(|state| *state = value);
    }

    fn update(&self, f: impl FnOnce(&mut ToggleState)) {
        match self.state.lock() {
            Ok(mut state) => f(&mut state),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }
}

/// What the server said about a toggle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outcome {
    pub success: bool,
    pub message: Option<String>,
    /// Authoritative counter, if the response carried one.
    pub count: Option<u64>,
    pub active: Option<bool>,
}

impl Outcome {
    pub fn confirmed() -> Self {
        Self {
            success: true,
            ..Default::default()
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn with_count(mut self, count: Option<u64>) -> Self {
        self.count = count;
        self
    }

    pub fn with_active(mut self, active: Option<bool>) -> Self {
        self.active = active;
        self
    }
}

/// A toggle that did not stick. The cell is already back at `restored`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct MutationError {
    pub mutation_id: Uuid,
    pub message: String,
    pub restored: ToggleState,
}

/// Apply the toggle to `cell`, run `call` with the intended flag value and
/// settle the cell on the result.
pub async fn run_toggle<F, Fut>(cell: &ToggleCell, call: F) -> Result<ToggleState, MutationError>
where
    F: FnOnce(bool) -> Fut,
    Fut: Future<Output = ApiResult<Outcome>>,
{
    let mutation_id = Uuid::now_v7();
    let previous = cell.get();
    let intended = previous.toggled();
    cell.set(intended);
    tracing::debug!(
        "Mutation {}: {:?} -> {:?}",
        mutation_id,
        previous,
        intended
    );

    let failure = match call(intended.active).await {
        Ok(outcome) if outcome.success => {
            cell.update(|state| {
                if let Some(count) = outcome.count {
                    state.count = count;
                }
                if let Some(active) = outcome.active {
                    state.active = active;
                }
            });
            return Ok(cell.get());
        }
        Ok(outcome) => normalize_message(outcome.message.as_deref(), None, None),
        Err(e) => {
            tracing::error!("Mutation {} failed: {}", mutation_id, e);
            e.message()
        }
    };

    cell.set(previous);
    tracing::info!(
        "Mutation {} rolled back to {:?}: {}",
        mutation_id,
        previous,
        failure
    );
    Err(MutationError {
        mutation_id,
        message: failure,
        restored: previous,
    })
}
