//! Simulation loop
//!
//! A [`Simulation`] owns one world and everything needed to run it: the
//! scope arena, the type registry, the factory, the behavior table and the
//! event queue. Each [`Simulation::update`] advances the clock, updates the
//! world, delivers due events to reactions and finally applies the
//! structural changes actions deferred during the frame.

use crate::action::{
    self, Action, ActionCreateAction, ActionDestroyAction, ActionEvent, ActionIncrement, ActionList,
    ActionListIf,
};
use crate::config::SimulationConfig;
use crate::context::{Behavior, Behaviors, WorldContext};
use crate::error::{Result, WorldError};
use crate::reaction::{self, EventMessage, Reaction};
use crate::state::WorldState;
use crate::world::{Entity, Sector, World, NAME_KEY};
use crossbeam_channel::Receiver;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use void_event::{EventEnvelope, EventQueue, GameTime, SubscriberId};
use void_reflect::{
    Attributed, Factory, JsonLoader, RttiType, ScopeArena, ScopeId, TypeManager,
};

/// A world plus the machinery that updates it
pub struct Simulation {
    arena: ScopeArena,
    types: TypeManager,
    factory: Factory,
    behaviors: Behaviors,
    queue: Arc<EventQueue>,
    mailbox: Receiver<EventEnvelope>,
    subscriber: SubscriberId,
    state: WorldState,
    world: ScopeId,
    config: SimulationConfig,
}

impl Simulation {
    /// Create a simulation with its own event queue
    pub fn new(name: impl Into<String>, config: SimulationConfig) -> Result<Self> {
        let queue = Arc::new(EventQueue::new(config.event_queue.clone()));
        Self::with_queue(name, config, queue)
    }

    /// Create a simulation that listens on a shared event queue
    pub fn with_queue(
        name: impl Into<String>,
        config: SimulationConfig,
        queue: Arc<EventQueue>,
    ) -> Result<Self> {
        let mut types = TypeManager::new();
        let mut factory = Factory::new();
        let mut behaviors = Behaviors::new();
        register_builtins(&mut types, &mut factory, &mut behaviors)?;

        let mut arena = ScopeArena::new();
        let world = arena.create_attributed(&types, World::new(name))?;

        let (sender, mailbox) = crossbeam_channel::unbounded();
        let subscriber = queue.subscriptions().subscribe::<EventMessage>(Arc::new(
            move |envelope: &EventEnvelope| {
                if sender.send(envelope.clone()).is_err() {
                    log::warn!("Simulation mailbox is closed; dropping {}", envelope.type_name());
                }
            },
        ));

        log::debug!("Simulation created with {} registered types", types.len());
        Ok(Self {
            arena,
            types,
            factory,
            behaviors,
            queue,
            mailbox,
            subscriber,
            state: WorldState::new(),
            world,
            config,
        })
    }

    /// Register an attributed type for construction by class name
    pub fn register<T: Attributed + Default>(&mut self) -> Result<()> {
        self.types.register::<T>()?;
        self.factory.register::<T>()?;
        Ok(())
    }

    /// Register an action type together with its per-frame behavior
    pub fn register_action<T: Attributed + Default>(&mut self, behavior: Behavior) -> Result<()> {
        self.register::<T>()?;
        self.behaviors.register::<T>(behavior);
        Ok(())
    }

    /// Advance by one frame. Every stage runs even when an earlier one
    /// fails; the first error is returned.
    pub fn update(&mut self, delta: Duration) -> Result<()> {
        let delta = self.config.clamp_delta(delta);
        self.state.time.advance(delta);
        log::trace!("Frame at {:?}", self.state.time.total());

        let world = self.world;
        let updated = self.context().update_world(world);
        if let Err(error) = &updated {
            log::error!("World update failed: {}", error);
        }

        self.queue.update(&self.state.time);
        let dispatched = self.dispatch_events();
        let applied = self.apply_deferred();
        updated.and(dispatched.map(|_| ())).and(applied)
    }

    /// Deliver mailbox messages to every reaction under the world.
    /// Returns the number of reactions that ran. A failing reaction does
    /// not stop delivery of the other messages; the first failure is
    /// returned once all of them are delivered.
    pub fn dispatch_events(&mut self) -> Result<usize> {
        let messages: Vec<EventEnvelope> = self.mailbox.try_iter().collect();
        if messages.is_empty() {
            return Ok(0);
        }

        let reactions = self.reactions();
        let mut ran = 0;
        let mut failure = None;
        let mut ctx = self.context();
        for envelope in &messages {
            let Some(message) = envelope.downcast_ref::<EventMessage>() else {
                continue;
            };
            for &id in &reactions {
                if !ctx.arena.contains(id) {
                    continue;
                }
                match reaction::react(&mut ctx, id, message) {
                    Ok(true) => ran += 1,
                    Ok(false) => {}
                    Err(error) => {
                        log::error!("Reaction {:?} failed on '{}': {}", id, message.subtype(), error);
                        failure.get_or_insert(error);
                    }
                }
            }
        }
        match failure {
            Some(error) => Err(error),
            None => Ok(ran),
        }
    }

    /// Apply creations then destructions deferred by actions
    pub fn apply_deferred(&mut self) -> Result<()> {
        let (creates, destroys) = self.state.take_pending();
        for create in creates {
            if !self.arena.contains(create.parent) {
                log::warn!("Dropping creation of '{}': parent is gone", create.name);
                continue;
            }
            self.create_action_in(create.parent, &create.key, &create.class, &create.name)?;
        }
        for destroy in destroys {
            match self.find_named(destroy.parent, &destroy.key, &destroy.name) {
                Some(id) => self.arena.destroy(id)?,
                None => log::warn!("No action named '{}' to destroy", destroy.name),
            }
        }
        Ok(())
    }

    /// Add a sector to the world
    pub fn create_sector(&mut self, name: &str) -> Result<ScopeId> {
        self.create_named(self.world, World::SECTORS, Sector::TYPE_NAME, name)
    }

    /// Add an entity to `sector`
    pub fn create_entity(&mut self, sector: ScopeId, name: &str) -> Result<ScopeId> {
        self.expect::<Sector>(sector)?;
        self.create_named(sector, Sector::ENTITIES, Entity::TYPE_NAME, name)
    }

    /// Add an action of class `class` to the `Actions` of an entity or
    /// action list
    pub fn create_action(&mut self, parent: ScopeId, class: &str, name: &str) -> Result<ScopeId> {
        self.create_action_in(parent, ActionList::ACTIONS, class, name)
    }

    /// Add an action of class `class` under any table attribute of `parent`
    pub fn create_action_in(
        &mut self,
        parent: ScopeId,
        key: &str,
        class: &str,
        name: &str,
    ) -> Result<ScopeId> {
        let id = self
            .arena
            .create_child(&self.types, &self.factory, parent, class, key)?;
        if self.arena.object::<Action>(id).is_none() {
            self.arena.destroy(id)?;
            return Err(WorldError::WrongKind {
                scope: parent,
                expected: Action::TYPE_NAME,
            });
        }
        self.set_name(id, name)?;
        Ok(id)
    }

    /// Load a JSON document into the world scope
    pub fn load_json(&mut self, text: &str) -> Result<()> {
        JsonLoader::new(&self.types, &self.factory).load_str(&mut self.arena, self.world, text)?;
        Ok(())
    }

    /// Child of `parent` under `key` whose `Name` is `name`
    pub fn find_named(&self, parent: ScopeId, key: &str, name: &str) -> Option<ScopeId> {
        let datum = self.arena.get(parent)?.find(key)?;
        datum.scopes().into_iter().find(|&child| {
            self.arena
                .get(child)
                .and_then(|scope| scope.find(NAME_KEY))
                .and_then(|datum| datum.get::<String>(0).ok())
                .is_some_and(|child_name| child_name == name)
        })
    }

    /// Sector of the world named `name`
    pub fn find_sector(&self, name: &str) -> Option<ScopeId> {
        self.find_named(self.world, World::SECTORS, name)
    }

    /// Every reaction under the world, breadth first
    pub fn reactions(&self) -> Vec<ScopeId> {
        let mut found = Vec::new();
        let mut queue = VecDeque::from([self.world]);
        while let Some(id) = queue.pop_front() {
            let Some(scope) = self.arena.get(id) else {
                continue;
            };
            if scope.is(Reaction::TYPE_ID) {
                found.push(id);
            }
            queue.extend(scope.child_ids());
        }
        found
    }

    pub fn world(&self) -> ScopeId {
        self.world
    }

    pub fn arena(&self) -> &ScopeArena {
        &self.arena
    }

    pub fn arena_mut(&mut self) -> &mut ScopeArena {
        &mut self.arena
    }

    pub fn types(&self) -> &TypeManager {
        &self.types
    }

    pub fn factory(&self) -> &Factory {
        &self.factory
    }

    pub fn queue(&self) -> &Arc<EventQueue> {
        &self.queue
    }

    pub fn state(&self) -> &WorldState {
        &self.state
    }

    pub fn time(&self) -> GameTime {
        self.state.time
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Update context over this simulation's parts
    pub fn context(&mut self) -> WorldContext<'_> {
        WorldContext::new(
            &mut self.arena,
            &self.types,
            &self.factory,
            &self.behaviors,
            &self.queue,
            &mut self.state,
        )
    }

    fn expect<T: RttiType>(&self, id: ScopeId) -> Result<()> {
        match self.arena.object::<T>(id) {
            Some(_) => Ok(()),
            None => Err(WorldError::WrongKind {
                scope: id,
                expected: T::TYPE_NAME,
            }),
        }
    }

    fn create_named(&mut self, parent: ScopeId, key: &str, class: &str, name: &str) -> Result<ScopeId> {
        let id = self
            .arena
            .create_child(&self.types, &self.factory, parent, class, key)?;
        self.set_name(id, name)?;
        Ok(id)
    }

    fn set_name(&mut self, id: ScopeId, name: &str) -> Result<()> {
        self.arena
            .scope_mut(id)?
            .at_mut(NAME_KEY)?
            .set(name.to_string(), 0)?;
        Ok(())
    }
}

impl Drop for Simulation {
    fn drop(&mut self) {
        self.queue.subscriptions().unsubscribe(self.subscriber);
    }
}

impl fmt::Debug for Simulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulation")
            .field("world", &self.world)
            .field("scopes", &self.arena.len())
            .field("types", &self.types.len())
            .field("time", &self.state.time)
            .field("queued", &self.queue.len())
            .finish()
    }
}

fn register_builtins(
    types: &mut TypeManager,
    factory: &mut Factory,
    behaviors: &mut Behaviors,
) -> Result<()> {
    fn add<T: Attributed + Default>(
        types: &mut TypeManager,
        factory: &mut Factory,
        behaviors: &mut Behaviors,
        behavior: Option<Behavior>,
    ) -> Result<()> {
        types.register::<T>()?;
        factory.register::<T>()?;
        if let Some(behavior) = behavior {
            behaviors.register::<T>(behavior);
        }
        Ok(())
    }

    add::<World>(types, factory, behaviors, None)?;
    add::<Sector>(types, factory, behaviors, None)?;
    add::<Entity>(types, factory, behaviors, None)?;
    add::<Action>(types, factory, behaviors, Some(action::update_noop))?;
    add::<ActionList>(types, factory, behaviors, Some(action::update_list))?;
    add::<ActionListIf>(types, factory, behaviors, Some(action::update_list_if))?;
    add::<ActionIncrement>(types, factory, behaviors, Some(action::update_increment))?;
    add::<ActionCreateAction>(types, factory, behaviors, Some(action::update_create_action))?;
    add::<ActionDestroyAction>(types, factory, behaviors, Some(action::update_destroy_action))?;
    add::<ActionEvent>(types, factory, behaviors, Some(action::update_event))?;
    // Reactions run on events only
    add::<Reaction>(types, factory, behaviors, Some(action::update_noop))?;
    Ok(())
}
