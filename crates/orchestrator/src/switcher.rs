//! Adapter selection and failover over an ordered roster.

use std::sync::Arc;

use async_trait::async_trait;
use brain_core::{Adapter, AdapterReply, BrainError, Turn};
use llm_adapter::{AdapterEntry, HttpTransport, LlmAdapter, Transport, DEFAULT_TIMEOUT};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::OrchestratorError;

/// Builds adapter instances from roster entries.
#[async_trait]
pub trait AdapterFactory: Send + Sync {
    /// Build the adapter for one entry.
    async fn build(&self, entry: &AdapterEntry) -> Result<Arc<dyn Adapter>, BrainError>;
}

/// Factory producing [`LlmAdapter`]s that share one HTTP transport.
pub struct LlmAdapterFactory {
    transport: Arc<dyn Transport>,
}

impl LlmAdapterFactory {
    /// Create a factory with its own HTTP transport.
    pub fn new() -> Result<Self, BrainError> {
        Ok(Self {
            transport: Arc::new(HttpTransport::new(DEFAULT_TIMEOUT)?),
        })
    }

    /// Create a factory over an existing transport.
    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl AdapterFactory for LlmAdapterFactory {
    async fn build(&self, entry: &AdapterEntry) -> Result<Arc<dyn Adapter>, BrainError> {
        Ok(Arc::new(LlmAdapter::new(entry.clone(), self.transport.clone())?))
    }
}

enum Slot {
    /// Built on first use from configuration.
    Configured {
        entry: AdapterEntry,
        instance: Option<Arc<dyn Adapter>>,
    },
    /// Supplied ready-made.
    Fixed(Arc<dyn Adapter>),
}

#[derive(Default)]
struct Roster {
    slots: Vec<Slot>,
    current: usize,
}

/// Holds the ordered backend roster and the currently selected entry.
///
/// Selection sticks to the last entry that worked; a transport failure moves
/// it forward, wrapping around.
pub struct AdapterSwitcher {
    roster: RwLock<Roster>,
    factory: Arc<dyn AdapterFactory>,
}

impl AdapterSwitcher {
    /// Create a switcher over configured entries.
    pub fn new(entries: Vec<AdapterEntry>, factory: Arc<dyn AdapterFactory>) -> Self {
        Self {
            roster: RwLock::new(Roster {
                slots: configured(entries),
                current: 0,
            }),
            factory,
        }
    }

    /// Create a switcher that builds [`LlmAdapter`]s over HTTP.
    pub fn from_entries(entries: Vec<AdapterEntry>) -> Result<Self, OrchestratorError> {
        let factory =
            LlmAdapterFactory::new().map_err(|e| OrchestratorError::Configuration(e.to_string()))?;
        Ok(Self::new(entries, Arc::new(factory)))
    }

    /// Create a switcher over ready-made adapters, in priority order.
    pub fn with_adapters(adapters: Vec<Arc<dyn Adapter>>) -> Self {
        Self {
            roster: RwLock::new(Roster {
                slots: adapters.into_iter().map(Slot::Fixed).collect(),
                current: 0,
            }),
            factory: Arc::new(StandaloneFactory),
        }
    }

    /// Number of roster entries.
    pub async fn len(&self) -> usize {
        self.roster.read().await.slots.len()
    }

    /// Whether the roster is empty.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Index of the currently selected entry.
    pub async fn current_index(&self) -> usize {
        self.roster.read().await.current
    }

    /// The selected entry's index and adapter, building it if needed.
    pub async fn get_adapter(&self) -> Result<(usize, Arc<dyn Adapter>), OrchestratorError> {
        let index = self.current_index().await;
        self.adapter_at(index).await.map(|adapter| (index, adapter))
    }

    /// The adapter at a roster position, building it if needed.
    async fn adapter_at(&self, index: usize) -> Result<Arc<dyn Adapter>, OrchestratorError> {
        {
            let roster = self.roster.read().await;
            match roster.slots.get(index) {
                None => return Err(missing(index)),
                Some(Slot::Fixed(adapter)) => return Ok(adapter.clone()),
                Some(Slot::Configured {
                    instance: Some(adapter),
                    ..
                }) => return Ok(adapter.clone()),
                Some(Slot::Configured { instance: None, .. }) => {}
            }
        }

        let mut roster = self.roster.write().await;
        match roster.slots.get_mut(index) {
            Some(Slot::Configured { entry, instance }) => {
                if let Some(adapter) = instance {
                    return Ok(adapter.clone());
                }
                let adapter = self.factory.build(entry).await.map_err(|e| {
                    OrchestratorError::Configuration(format!(
                        "failed to build adapter {}: {e}",
                        entry.label()
                    ))
                })?;
                debug!(index, adapter = adapter.name(), "adapter built");
                *instance = Some(adapter.clone());
                Ok(adapter)
            }
            Some(Slot::Fixed(adapter)) => Ok(adapter.clone()),
            // The roster was swapped between the two locks.
            None => Err(missing(index)),
        }
    }

    /// Replace the roster. Cached instances are dropped; calls already
    /// holding an adapter finish on it.
    pub async fn update_config(&self, entries: Vec<AdapterEntry>) -> Result<(), OrchestratorError> {
        for entry in &entries {
            entry
                .validate()
                .map_err(|e| OrchestratorError::Configuration(e.to_string()))?;
        }
        let count = entries.len();
        let mut roster = self.roster.write().await;
        *roster = Roster {
            slots: configured(entries),
            current: 0,
        };
        info!(adapters = count, "adapter roster replaced");
        Ok(())
    }

    /// Move past `failed` if it is still the selected entry.
    async fn advance(&self, failed: usize) {
        let mut roster = self.roster.write().await;
        let len = roster.slots.len();
        if len > 0 && roster.current == failed {
            roster.current = (failed + 1) % len;
        }
    }

    /// Call the selected adapter, failing over on transport errors.
    ///
    /// Entries are tried in roster order starting from the selected one, at
    /// most once each, regardless of what concurrent calls do to the
    /// selection. Non-transport errors are returned immediately.
    pub async fn call_with_failover(
        &self,
        system_prompt: &str,
        turns: &[Turn],
    ) -> Result<(usize, AdapterReply), OrchestratorError> {
        let (start, attempts) = {
            let roster = self.roster.read().await;
            (roster.current, roster.slots.len())
        };
        let mut last = None;

        for offset in 0..attempts {
            let index = (start + offset) % attempts;
            let adapter = self.adapter_at(index).await?;
            match adapter.call(system_prompt, turns).await {
                Ok(reply) => return Ok((index, reply)),
                Err(e) if e.is_transport() => {
                    warn!(
                        index,
                        adapter = adapter.name(),
                        error = %e,
                        "ADAPTER_FAILOVER"
                    );
                    self.advance(index).await;
                    last = Some(e);
                }
                Err(e) => return Err(OrchestratorError::Brain(e)),
            }
        }

        Err(OrchestratorError::AdaptersExhausted { attempts, last })
    }
}

fn missing(index: usize) -> OrchestratorError {
    if index == 0 {
        OrchestratorError::Configuration("adapter roster is empty".to_string())
    } else {
        OrchestratorError::Configuration(format!("no adapter at roster index {index}"))
    }
}

fn configured(entries: Vec<AdapterEntry>) -> Vec<Slot> {
    entries
        .into_iter()
        .map(|entry| Slot::Configured {
            entry,
            instance: None,
        })
        .collect()
}

/// Builds each adapter with its own HTTP client. Used once a roster of
/// ready-made adapters is replaced by configuration.
struct StandaloneFactory;

#[async_trait]
impl AdapterFactory for StandaloneFactory {
    async fn build(&self, entry: &AdapterEntry) -> Result<Arc<dyn Adapter>, BrainError> {
        LlmAdapter::from_entry(entry.clone()).map(|a| Arc::new(a) as Arc<dyn Adapter>)
    }
}
