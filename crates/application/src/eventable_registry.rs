use std::collections::HashMap;
use std::sync::Arc;

use eventable_core::{AppError, AppResult};
use eventable_domain::EventableType;

use crate::EventableStore;

/// Explicit mapping from eventable type tags to their stores.
///
/// Built once at startup; types are never resolved by name at runtime.
#[derive(Clone, Default)]
pub struct EventableRegistry {
    stores: HashMap<EventableType, Arc<dyn EventableStore>>,
}

impl EventableRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the store for one eventable type.
    pub fn register(
        &mut self,
        eventable_type: EventableType,
        store: Arc<dyn EventableStore>,
    ) -> AppResult<()> {
        if self.stores.contains_key(&eventable_type) {
            return Err(AppError::Conflict(format!(
                "eventable type '{eventable_type}' is already registered"
            )));
        }

        self.stores.insert(eventable_type, store);
        Ok(())
    }

    /// Builder-style variant of [`EventableRegistry::register`].
    pub fn with_store(
        mut self,
        eventable_type: EventableType,
        store: Arc<dyn EventableStore>,
    ) -> AppResult<Self> {
        self.register(eventable_type, store)?;
        Ok(self)
    }

    /// Returns the store for a type, or a resolution error if none is registered.
    pub fn store_for(&self, eventable_type: &EventableType) -> AppResult<Arc<dyn EventableStore>> {
        self.stores.get(eventable_type).cloned().ok_or_else(|| {
            AppError::Resolution(format!(
                "no eventable store registered for type '{eventable_type}'"
            ))
        })
    }

    /// Returns whether a type has a store.
    #[must_use]
    pub fn contains(&self, eventable_type: &EventableType) -> bool {
        self.stores.contains_key(eventable_type)
    }

    /// Returns registered types in name order.
    #[must_use]
    pub fn registered_types(&self) -> Vec<EventableType> {
        let mut types: Vec<EventableType> = self.stores.keys().cloned().collect();
        types.sort();
        types
    }
}
