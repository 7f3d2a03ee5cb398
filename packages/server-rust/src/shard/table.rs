//! Shard ownership table.
//!
//! An arena indexed by shard ID. A slot holds the one live engine for a shard
//! while this host owns it. Owners of remote shards are not cached here; they
//! are asked of the membership resolver when needed. All access goes through a
//! single mutex held only for the slot update, never across engine
//! construction or teardown.

use std::sync::Arc;

use history_router_core::ShardId;
use parking_lot::Mutex;

use super::engine::Engine;

type ShardSlot = Option<Arc<dyn Engine>>;

/// Fixed-size table of shard slots.
pub struct ShardOwnershipTable {
    slots: Mutex<Vec<ShardSlot>>,
    number_of_shards: u32,
}

impl ShardOwnershipTable {
    #[must_use]
    pub fn new(number_of_shards: u32) -> Self {
        let slots = (0..number_of_shards).map(|_| None).collect();
        Self {
            slots: Mutex::new(slots),
            number_of_shards,
        }
    }

    #[must_use]
    pub fn number_of_shards(&self) -> u32 {
        self.number_of_shards
    }

    /// Returns the local engine for a shard, if one is installed.
    #[must_use]
    pub fn engine(&self, shard_id: ShardId) -> Option<Arc<dyn Engine>> {
        self.slots
            .lock()
            .get(shard_id as usize)
            .and_then(Clone::clone)
    }

    #[must_use]
    pub fn has_engine(&self, shard_id: ShardId) -> bool {
        self.slots
            .lock()
            .get(shard_id as usize)
            .is_some_and(Option::is_some)
    }

    /// Installs an engine into an empty slot.
    ///
    /// Returns the engine back if the slot is already occupied or out of range,
    /// so the caller can release it. A slot never holds two engines.
    pub fn install(&self, shard_id: ShardId, engine: Arc<dyn Engine>) -> Option<Arc<dyn Engine>> {
        let mut slots = self.slots.lock();
        match slots.get_mut(shard_id as usize) {
            Some(slot) if slot.is_none() => {
                *slot = Some(engine);
                None
            }
            _ => Some(engine),
        }
    }

    /// Removes and returns the engine for a shard.
    pub fn take(&self, shard_id: ShardId) -> Option<Arc<dyn Engine>> {
        self.slots
            .lock()
            .get_mut(shard_id as usize)
            .and_then(Option::take)
    }

    /// Removes every engine, returning them with their shard IDs.
    pub fn drain(&self) -> Vec<(ShardId, Arc<dyn Engine>)> {
        let mut slots = self.slots.lock();
        (0..self.number_of_shards)
            .zip(slots.iter_mut())
            .filter_map(|(shard_id, slot)| slot.take().map(|e| (shard_id, e)))
            .collect()
    }

    /// IDs of the shards with a local engine, ascending.
    #[must_use]
    pub fn owned_shards(&self) -> Vec<ShardId> {
        let slots = self.slots.lock();
        (0..self.number_of_shards)
            .zip(slots.iter())
            .filter(|(_, slot)| slot.is_some())
            .map(|(shard_id, _)| shard_id)
            .collect()
    }

    #[must_use]
    pub fn owned_count(&self) -> usize {
        self.slots
            .lock()
            .iter()
            .filter(|slot| slot.is_some())
            .count()
    }
}
