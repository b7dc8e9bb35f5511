//! Behavior dispatch and the per-frame update context

use crate::error::{Result, WorldError};
use crate::state::WorldState;
use crate::world::{Entity, Sector, World};
use std::collections::HashMap;
use std::fmt;
use void_event::EventQueue;
use void_reflect::{Datum, Factory, RttiId, RttiType, ScopeArena, ScopeId, TypeManager};

/// Per-frame update of an action scope
pub type Behavior = fn(&mut WorldContext<'_>, ScopeId) -> Result<()>;

/// Type id → behavior table. Lookups fall back along the registered parent
/// chain, so a derived action runs its base's behavior unless it has its own.
#[derive(Clone, Default)]
pub struct Behaviors {
    table: HashMap<RttiId, Behavior>,
}

impl Behaviors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the behavior for `T`, returning the one it replaces
    pub fn register<T: RttiType>(&mut self, behavior: Behavior) -> Option<Behavior> {
        self.table.insert(T::TYPE_ID, behavior)
    }

    pub fn deregister(&mut self, id: RttiId) -> Option<Behavior> {
        self.table.remove(&id)
    }

    /// Behavior declared for exactly `id`
    pub fn get(&self, id: RttiId) -> Option<Behavior> {
        self.table.get(&id).copied()
    }

    /// Behavior of `id` or of its nearest registered ancestor
    pub fn resolve(&self, types: &TypeManager, id: RttiId) -> Option<Behavior> {
        let mut current = id;
        loop {
            if let Some(behavior) = self.get(current) {
                return Some(behavior);
            }
            current = types.parent_of(current)?;
            if current.is_root() {
                return None;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl fmt::Debug for Behaviors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Behaviors")
            .field("types", &self.table.len())
            .finish()
    }
}

/// Everything a behavior may touch during a frame
pub struct WorldContext<'a> {
    pub arena: &'a mut ScopeArena,
    pub types: &'a TypeManager,
    pub factory: &'a Factory,
    pub queue: &'a EventQueue,
    pub state: &'a mut WorldState,
    behaviors: &'a Behaviors,
}

impl<'a> WorldContext<'a> {
    pub fn new(
        arena: &'a mut ScopeArena,
        types: &'a TypeManager,
        factory: &'a Factory,
        behaviors: &'a Behaviors,
        queue: &'a EventQueue,
        state: &'a mut WorldState,
    ) -> Self {
        Self {
            arena,
            types,
            factory,
            queue,
            state,
            behaviors,
        }
    }

    /// Typed payload of `id`
    pub fn object<T: RttiType>(&self, id: ScopeId) -> Result<&T> {
        self.arena.object::<T>(id).ok_or(WorldError::WrongKind {
            scope: id,
            expected: T::TYPE_NAME,
        })
    }

    /// Scopes held by the table attribute `key` of `id`; empty when absent
    pub fn children_at(&self, id: ScopeId, key: &str) -> Result<Vec<ScopeId>> {
        Ok(self
            .arena
            .scope(id)?
            .find(key)
            .map(Datum::scopes)
            .unwrap_or_default())
    }

    /// Parent of `id` and the attribute of the parent that holds it
    pub fn slot_of(&self, id: ScopeId) -> Result<(ScopeId, String)> {
        let parent = self.arena.scope(id)?.parent().ok_or(WorldError::Detached(id))?;
        let key = self
            .arena
            .scope(parent)?
            .find_scope(id)
            .map(|(key, _)| key.to_string())
            .ok_or(WorldError::Detached(id))?;
        Ok((parent, key))
    }

    /// Run the behavior of action `id`
    pub fn run_action(&mut self, id: ScopeId) -> Result<()> {
        let scope = self.arena.scope(id)?;
        let behavior = self
            .behaviors
            .resolve(self.types, scope.dynamic_type())
            .ok_or_else(|| WorldError::NoBehavior(scope.type_name().to_string()))?;

        let previous = self.state.action.replace(id);
        let result = behavior(self, id);
        self.state.action = previous;
        result
    }

    /// Run every action in the table attribute `key` of `parent`, in order
    pub fn run_actions(&mut self, parent: ScopeId, key: &str) -> Result<()> {
        for action in self.children_at(parent, key)? {
            self.run_action(action)?;
        }
        Ok(())
    }

    /// Update every sector of `world`, every entity of each sector and
    /// every action of each entity
    pub fn update_world(&mut self, world: ScopeId) -> Result<()> {
        let result = self.walk_world(world);
        self.state.clear_cursor();
        result
    }

    fn walk_world(&mut self, world: ScopeId) -> Result<()> {
        self.object::<World>(world)?;
        self.state.world = Some(world);
        for sector in self.children_at(world, World::SECTORS)? {
            self.state.sector = Some(sector);
            for entity in self.children_at(sector, Sector::ENTITIES)? {
                self.state.entity = Some(entity);
                self.run_actions(entity, Entity::ACTIONS)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for WorldContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorldContext")
            .field("state", &self.state)
            .field("behaviors", &self.behaviors)
            .finish()
    }
}
