//! Semaphore bulkhead.
//!
//! # Responsibilities
//! - Bound the number of in-flight calls to the downstream
//! - Reject calls immediately when no slot is free
//!
//! # Design Decisions
//! - Zero wait: `try_acquire_owned`, never `acquire`
//! - Slot held by an RAII permit, so it is released exactly once on every path

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};

use crate::config::BulkheadConfig;

/// Returned when every slot is taken.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Bulkhead '{name}' is full and does not permit further calls")]
pub struct BulkheadFull {
    pub name: String,
    pub max_concurrent_calls: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkheadMetrics {
    pub max_concurrent_calls: usize,
    pub available_slots: usize,
}

/// Concurrency limiter with no queueing.
#[derive(Debug)]
pub struct Bulkhead {
    name: String,
    slots: Arc<Semaphore>,
    max_concurrent_calls: usize,
}

impl Bulkhead {
    pub fn new(name: impl Into<String>, config: &BulkheadConfig) -> Self {
        Self {
            name: name.into(),
            slots: Arc::new(Semaphore::new(config.max_concurrent_calls)),
            max_concurrent_calls: config.max_concurrent_calls,
        }
    }

    /// Take a slot if one is free right now.
    pub fn try_acquire(&self) -> Result<BulkheadPermit, BulkheadFull> {
        match self.slots.clone().try_acquire_owned() {
            Ok(permit) => {
                tracing::trace!(
                    bulkhead = %self.name,
                    available_slots = self.slots.available_permits(),
                    "Bulkhead slot acquired"
                );
                Ok(BulkheadPermit { _permit: permit })
            }
            Err(TryAcquireError::NoPermits) | Err(TryAcquireError::Closed) => Err(BulkheadFull {
                name: self.name.clone(),
                max_concurrent_calls: self.max_concurrent_calls,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn available_slots(&self) -> usize {
        self.slots.available_permits()
    }

    pub fn metrics(&self) -> BulkheadMetrics {
        BulkheadMetrics {
            max_concurrent_calls: self.max_concurrent_calls,
            available_slots: self.available_slots(),
        }
    }
}

/// A held bulkhead slot.
///
/// When dropped, the slot is released back to the bulkhead.
/// This keeps the count correct even if the caller panics.
#[derive(Debug)]
pub struct BulkheadPermit {
    _permit: OwnedSemaphorePermit,
}
