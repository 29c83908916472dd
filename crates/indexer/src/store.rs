use crate::{Entity, EntityId, EntityKind};
use std::collections::BTreeMap;

/// Where projected entities are persisted.
///
/// `save` is an upsert: saving an entity whose id already exists replaces it.
pub trait Store {
    fn save(&mut self, entity: Entity) -> Option<Entity>;

    fn get(&self, id: &EntityId) -> Option<&Entity>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory store ordered by entity id.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entities: BTreeMap<EntityId, Entity>,
}

impl MemoryStore {
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn of_kind(&self, kind: EntityKind) -> impl Iterator<Item = &Entity> {
        self.iter().filter(move |entity| entity.kind() == kind)
    }

    /// Entities sorted by block number, then log index.
    pub fn in_chain_order(&self) -> Vec<&Entity> {
        let mut entities: Vec<_> = self.iter().collect();
        entities.sort_by_key(|entity| (entity.meta().block_number, entity.id().log_index()));
        entities
    }

    /// Entities emitted in blocks `[from, to]`, in chain order.
    pub fn in_blocks(&self, from: u64, to: u64) -> Vec<&Entity> {
        let mut entities = self.in_chain_order();
        entities.retain(|entity| (from..=to).contains(&entity.meta().block_number));
        entities
    }
}

impl Store for MemoryStore {
    fn save(&mut self, entity: Entity) -> Option<Entity> {
        self.entities.insert(entity.id(), entity)
    }

    fn get(&self, id: &EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    fn len(&self) -> usize {
        self.entities.len()
    }
}
