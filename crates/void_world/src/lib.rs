//! # void_world - Scene Graph
//!
//! Worlds, sectors, entities and actions built on reflected scopes:
//! - [`World`] → [`Sector`] → [`Entity`] → [`Action`] containment, each an
//!   attributed type whose children live in table attributes
//! - Built-in actions: lists, conditionals, increments, deferred
//!   create/destroy and event raising
//! - [`Reaction`]s run when an [`EventMessage`] of a matching subtype arrives
//! - [`Simulation`] ties the arena, registry and event queue into a frame loop
//!
//! ```ignore
//! let mut sim = Simulation::new("Overworld", SimulationConfig::default())?;
//! let sector = sim.create_sector("Town")?;
//! let hero = sim.create_entity(sector, "Hero")?;
//! sim.create_action(hero, "ActionIncrement", "Regenerate")?;
//! sim.update(Duration::from_millis(16))?;
//! ```

pub mod action;
pub mod config;
pub mod context;
pub mod error;
pub mod reaction;
pub mod simulation;
pub mod state;
pub mod world;

pub use action::{
    Action, ActionCreateAction, ActionDestroyAction, ActionEvent, ActionIncrement, ActionList,
    ActionListIf,
};
pub use config::SimulationConfig;
pub use context::{Behavior, Behaviors, WorldContext};
pub use error::{Result, WorldError};
pub use reaction::{EventArgument, EventMessage, Reaction};
pub use simulation::Simulation;
pub use state::{PendingCreate, PendingDestroy, WorldState};
pub use world::{Entity, Sector, World, NAME_KEY};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        Action, ActionList, Entity, EventMessage, Reaction, Sector, Simulation, SimulationConfig,
        World, WorldContext, WorldError,
    };
}
