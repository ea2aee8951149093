//! Per-channel gate.
//!
//! Holding a channel's gate serializes "enqueue the triggering message" and
//! "evaluate the window" for that channel. Waiters resume in arrival order
//! (tokio's mutex is fair). Different channels never share a gate.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::trace;

/// Gates kept before idle ones are pruned.
const PRUNE_THRESHOLD: usize = 1024;

/// Guard returned by [`ChannelGate::enter`]; the gate opens when it drops.
pub type GateGuard = OwnedMutexGuard<()>;

/// One FIFO lock per channel.
#[derive(Debug, Default)]
pub struct ChannelGate {
    gates: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ChannelGate {
    /// Create an empty gate set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for the channel's gate and hold it until the guard drops.
    pub async fn enter(&self, channel_id: &str) -> GateGuard {
        let gate = {
            let mut gates = self.gates.lock().await;
            if gates.len() >= PRUNE_THRESHOLD {
                // Only this map holds a reference to idle gates.
                gates.retain(|_, gate| Arc::strong_count(gate) > 1);
            }
            gates
                .entry(channel_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        trace!(channel = %channel_id, "waiting for channel gate");
        gate.lock_owned().await
    }

    /// Number of gates currently allocated.
    pub async fn len(&self) -> usize {
        self.gates.lock().await.len()
    }

    /// Whether no gate is allocated.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
