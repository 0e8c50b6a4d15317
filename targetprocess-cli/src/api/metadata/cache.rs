//! Lazily initialised cache of legal entity type names
//!
//! The first caller that finds the cache uninitialised starts a single
//! discovery fetch; every caller arriving while it runs awaits that same
//! fetch. A failed fetch returns the cache to `Uninitialized` (the next check
//! tries again) and checks fall back to a built-in allow-list in the meantime.
//! The cache is advisory: it never turns a discovery outage into an error.

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use log::{debug, info, warn};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

use super::models::{CacheState, TypeCheck, TypeSource};
use crate::api::constants::FALLBACK_ENTITY_TYPES;
use crate::api::error::TransportError;

/// Anything that can list the entity types the service supports
#[async_trait]
pub trait EntityTypeSource: Send + Sync {
    async fn fetch_entity_types(&self) -> Result<Vec<String>, TransportError>;
}

/// Discovered types and when they were fetched
#[derive(Debug, Clone)]
pub struct CacheSnapshot {
    pub known_types: HashSet<String>,
    pub initialized_at: DateTime<Utc>,
}

type InitFuture = Shared<BoxFuture<'static, Result<Arc<HashSet<String>>, String>>>;

enum Slot {
    Uninitialized,
    Initializing { attempt: u64, fetch: InitFuture },
    Ready,
}

pub struct EntityTypeCache {
    source: Arc<dyn EntityTypeSource>,
    fallback: HashSet<String>,
    slot: Mutex<Slot>,
    snapshot: ArcSwapOption<CacheSnapshot>,
    attempts: AtomicU64,
}

impl EntityTypeCache {
    pub fn new(source: Arc<dyn EntityTypeSource>) -> Self {
        Self::with_fallback(
            source,
            FALLBACK_ENTITY_TYPES.iter().map(|name| name.to_string()),
        )
    }

    pub fn with_fallback(
        source: Arc<dyn EntityTypeSource>,
        fallback: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            source,
            fallback: fallback.into_iter().collect(),
            slot: Mutex::new(Slot::Uninitialized),
            snapshot: ArcSwapOption::empty(),
            attempts: AtomicU64::new(0),
        }
    }

    pub async fn state(&self) -> CacheState {
        match &*self.slot.lock().await {
            Slot::Uninitialized => CacheState::Uninitialized,
            Slot::Initializing { .. } => CacheState::Initializing,
            Slot::Ready => CacheState::Ready,
        }
    }

    /// Discovered types, if initialisation has succeeded
    pub fn snapshot(&self) -> Option<Arc<CacheSnapshot>> {
        self.snapshot.load_full()
    }

    pub fn initialized_at(&self) -> Option<DateTime<Utc>> {
        self.snapshot().map(|s| s.initialized_at)
    }

    /// Make sure discovery has run. Returns whether discovered types are
    /// available; a `false` means checks are answered from the fallback list.
    pub async fn ensure_initialized(&self) -> bool {
        if self.snapshot.load().is_some() {
            return true;
        }

        // State transition and fetch trigger happen under one lock
        let (attempt, fetch) = {
            let mut slot = self.slot.lock().await;
            match &*slot {
                Slot::Ready => return self.snapshot.load().is_some(),
                Slot::Initializing { attempt, fetch } => (*attempt, fetch.clone()),
                Slot::Uninitialized => {
                    let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
                    let fetch = self.start_fetch();
                    *slot = Slot::Initializing {
                        attempt,
                        fetch: fetch.clone(),
                    };
                    info!("Discovering entity types (attempt {})", attempt);
                    (attempt, fetch)
                }
            }
        };

        let outcome = fetch.await;

        let mut slot = self.slot.lock().await;
        let is_current =
            matches!(&*slot, Slot::Initializing { attempt: current, .. } if *current == attempt);

        match outcome {
            Ok(types) => {
                if is_current {
                    info!("Entity type cache ready with {} types", types.len());
                    self.snapshot.store(Some(Arc::new(CacheSnapshot {
                        known_types: (*types).clone(),
                        initialized_at: Utc::now(),
                    })));
                    *slot = Slot::Ready;
                }
                self.snapshot.load().is_some()
            }
            Err(message) => {
                if is_current {
                    warn!(
                        "Entity type discovery failed, using built-in type list: {}",
                        message
                    );
                    *slot = Slot::Uninitialized;
                }
                false
            }
        }
    }

    fn start_fetch(&self) -> InitFuture {
        let source = Arc::clone(&self.source);
        async move {
            let types = source
                .fetch_entity_types()
                .await
                .map_err(|e| e.to_string())?;
            if types.is_empty() {
                return Err("type discovery returned no entity types".to_string());
            }
            Ok(Arc::new(types.into_iter().collect::<HashSet<_>>()))
        }
        .boxed()
        .shared()
    }

    /// Check a type name, reporting which list answered
    pub async fn check(&self, entity_type: &str) -> TypeCheck {
        if self.ensure_initialized().await {
            if let Some(snapshot) = self.snapshot.load_full() {
                return TypeCheck {
                    valid: snapshot.known_types.contains(entity_type),
                    source: TypeSource::Discovered,
                };
            }
        }

        TypeCheck {
            valid: self.fallback.contains(entity_type),
            source: TypeSource::Fallback,
        }
    }

    /// Whether `entity_type` is legal. Falls back to the built-in list, with
    /// a warning, when discovery is unavailable.
    pub async fn is_valid(&self, entity_type: &str) -> bool {
        let check = self.check(entity_type).await;
        if check.source == TypeSource::Fallback {
            warn!(
                "Entity type cache unavailable; checked '{}' against built-in type list",
                entity_type
            );
        }
        debug!("Entity type '{}' valid: {}", entity_type, check.valid);
        check.valid
    }

    /// All legal type names, sorted
    pub async fn entity_types(&self) -> (Vec<String>, TypeSource) {
        let (types, source) = match self.ensure_initialized().await {
            true => match self.snapshot.load_full() {
                Some(snapshot) => (snapshot.known_types.clone(), TypeSource::Discovered),
                None => (self.fallback.clone(), TypeSource::Fallback),
            },
            false => (self.fallback.clone(), TypeSource::Fallback),
        };

        let mut types: Vec<String> = types.into_iter().collect();
        types.sort();
        (types, source)
    }

    /// Forget discovered types. An in-flight fetch is left to finish but its
    /// result is discarded.
    pub async fn reset(&self) {
        let mut slot = self.slot.lock().await;
        *slot = Slot::Uninitialized;
        self.snapshot.store(None);
        debug!("Entity type cache reset");
    }
}
