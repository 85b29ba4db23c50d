//! The set of collections (tabs) and which one has keyboard focus.

use crate::error::{AppError, Result};
use crate::events::ActiveEntryChanged;
use crate::file_utils::PathExt;
use crate::state::{Collection, CollectionKey, EntryRef};
use log::{debug, info, warn};
use std::collections::BTreeMap;

pub struct CollectionRegistry {
    collections: BTreeMap<CollectionKey, Collection>,
    current: CollectionKey,
}

/// What a successful transfer changed.
#[derive(Debug)]
pub struct TransferOutcome {
    pub source: CollectionKey,
    pub target: CollectionKey,
    /// The target did not exist before the transfer.
    pub created: bool,
    /// Active-pointer change in the source caused by removing the entry.
    pub source_reassigned: Option<ActiveEntryChanged>,
}

impl CollectionRegistry {
    /// Creates a registry holding only the default collection, which has focus.
    pub fn new() -> Self {
        let mut collections = BTreeMap::new();
        collections.insert(
            CollectionKey::Default,
            Collection::new(CollectionKey::Default, true),
        );
        Self {
            collections,
            current: CollectionKey::Default,
        }
    }

    pub fn get(&self, key: CollectionKey) -> Option<&Collection> {
        self.collections.get(&key)
    }

    pub fn get_mut(&mut self, key: CollectionKey) -> Option<&mut Collection> {
        self.collections.get_mut(&key)
    }

    /// Returns the collection for `key`, creating it if needed.
    ///
    /// The flag is true when the collection was created by this call.
    pub fn get_or_create(&mut self, key: CollectionKey) -> (&mut Collection, bool) {
        let mut created = false;
        let collection = self.collections.entry(key).or_insert_with(|| {
            info!("Creating collection {}", key);
            created = true;
            Collection::new(key, false)
        });
        (collection, created)
    }

    pub fn keys(&self) -> impl Iterator<Item = CollectionKey> + '_ {
        self.collections.keys().copied()
    }

    pub fn collections(&self) -> impl Iterator<Item = &Collection> {
        self.collections.values()
    }

    pub fn current_key(&self) -> CollectionKey {
        self.current
    }

    pub fn current(&self) -> &Collection {
        self.collections
            .get(&self.current)
            .or_else(|| self.collections.get(&CollectionKey::Default))
            .expect("default collection always exists")
    }

    pub fn current_mut(&mut self) -> &mut Collection {
        if !self.collections.contains_key(&self.current) {
            self.current = CollectionKey::Default;
        }
        self.collections
            .get_mut(&self.current)
            .expect("default collection always exists")
    }

    /// Moves keyboard focus to `key`.
    pub fn set_current(&mut self, key: CollectionKey) -> Result<()> {
        if !self.collections.contains_key(&key) {
            return Err(AppError::UnknownCollection(key));
        }
        if self.current != key {
            debug!("Focus moved from {} to {}", self.current, key);
            self.current = key;
        }
        Ok(())
    }

    /// Removes a collection and its entries. The default collection cannot be closed.
    ///
    /// Closing the focused collection moves focus back to the default collection.
    pub fn close(&mut self, key: CollectionKey) -> Result<Collection> {
        if key.is_default() {
            return Err(AppError::CannotClose(key));
        }
        let collection = self
            .collections
            .remove(&key)
            .ok_or(AppError::UnknownCollection(key))?;
        if self.current == key {
            self.current = CollectionKey::Default;
        }
        info!("Closed collection {} ({} entries)", key, collection.len());
        Ok(collection)
    }

    /// Finds the collection that currently owns `entry`.
    pub fn owner_of(&self, entry: &EntryRef) -> Option<CollectionKey> {
        self.collections
            .values()
            .find(|c| c.contains(entry))
            .map(Collection::key)
    }

    /// Moves `entry` from `source` into the collection at `target`.
    ///
    /// The target is created when missing. The moved entry is never activated in
    /// its new home. Returns `None` (and changes nothing) when source and target
    /// are the same, or when `source` does not hold the entry.
    pub fn transfer(
        &mut self,
        source: CollectionKey,
        target: CollectionKey,
        entry: &EntryRef,
    ) -> Option<TransferOutcome> {
        if source == target {
            debug!("Transfer to the same collection {} ignored", source);
            return None;
        }

        let removal = match self.collections.get_mut(&source) {
            Some(collection) => collection.remove(entry),
            None => {
                warn!("Transfer source {} does not exist", source);
                return None;
            }
        };
        let Some(removal) = removal else {
            warn!(
                "Transfer ignored: {} is not in collection {}",
                entry.path().format_for_log(),
                source
            );
            return None;
        };

        let (target_collection, created) = self.get_or_create(target);
        target_collection.add(removal.entry, false);
        debug!(
            "Moved {} from {} to {}",
            entry.path().format_for_log(),
            source,
            target
        );

        Some(TransferOutcome {
            source,
            target,
            created,
            source_reassigned: removal.reassigned,
        })
    }
}

impl Default for CollectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
