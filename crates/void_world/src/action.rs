//! Actions and their built-in behaviors
//!
//! Every action type derives from [`Action`]. What an action does each frame
//! is a [`Behavior`](crate::context::Behavior) registered for its type; types
//! without one inherit the behavior of their nearest registered base.

use crate::context::WorldContext;
use crate::error::{Result, WorldError};
use crate::reaction::{EventArgument, EventMessage};
use crate::state::{PendingCreate, PendingDestroy};
use crate::world::NAME_KEY;
use std::time::Duration;
use void_event::EventEnvelope;
use void_reflect::{attributed, Attributed, DatumType, Member, ScopeId, Signature};

/// Base of every action
#[derive(Debug, Clone, Default)]
pub struct Action {
    name: Member<String>,
}

attributed!(Action {
    fn describe(&self) -> String {
        format!("Action({})", self.name.value())
    }
});

impl Action {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Member::scalar(name.into()),
        }
    }

    pub fn name(&self) -> String {
        self.name.value()
    }
}

impl Attributed for Action {
    fn signatures() -> Vec<Signature> {
        vec![Signature::external(NAME_KEY, 1, |a: &Action| &a.name)]
    }
}

/// Runs its child actions in order
#[derive(Debug, Clone, Default)]
pub struct ActionList {
    base: Action,
}

attributed!(ActionList: Action => base);

impl ActionList {
    /// Table attribute holding child actions
    pub const ACTIONS: &'static str = "Actions";

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            base: Action::new(name),
        }
    }

    pub fn name(&self) -> String {
        self.base.name()
    }
}

impl Attributed for ActionList {
    fn signatures() -> Vec<Signature> {
        vec![Signature::internal(Self::ACTIONS, DatumType::Table, 0)]
    }
}

/// Runs `Then` when `Condition` is non-zero, `Else` otherwise
#[derive(Debug, Clone, Default)]
pub struct ActionListIf {
    base: Action,
    condition: Member<i32>,
}

attributed!(ActionListIf: Action => base);

impl ActionListIf {
    pub const CONDITION: &'static str = "Condition";
    pub const THEN: &'static str = "Then";
    pub const ELSE: &'static str = "Else";

    pub fn condition(&self) -> i32 {
        self.condition.value()
    }

    pub fn set_condition(&self, condition: i32) {
        self.condition.set(0, condition);
    }
}

impl Attributed for ActionListIf {
    fn signatures() -> Vec<Signature> {
        vec![
            Signature::external(Self::CONDITION, 1, |a: &ActionListIf| &a.condition),
            Signature::internal(Self::THEN, DatumType::Table, 0),
            Signature::internal(Self::ELSE, DatumType::Table, 0),
        ]
    }
}

/// Adds `Step` to the numeric attribute named by `Target`, found on the
/// action or its nearest ancestor. Integer targets reject fractional steps.
#[derive(Debug, Clone)]
pub struct ActionIncrement {
    base: Action,
    target: Member<String>,
    step: Member<f32>,
}

attributed!(ActionIncrement: Action => base);

impl ActionIncrement {
    pub const TARGET: &'static str = "Target";
    pub const STEP: &'static str = "Step";

    pub fn new(target: impl Into<String>, step: f32) -> Self {
        Self {
            base: Action::default(),
            target: Member::scalar(target.into()),
            step: Member::scalar(step),
        }
    }

    pub fn target(&self) -> String {
        self.target.value()
    }

    pub fn step(&self) -> f32 {
        self.step.value()
    }
}

impl Default for ActionIncrement {
    fn default() -> Self {
        Self::new(String::new(), 1.0)
    }
}

impl Attributed for ActionIncrement {
    fn signatures() -> Vec<Signature> {
        vec![
            Signature::external(Self::TARGET, 1, |a: &ActionIncrement| &a.target),
            Signature::external(Self::STEP, 1, |a: &ActionIncrement| &a.step),
        ]
    }
}

/// Creates an action of class `Prototype` named `InstanceName` next to
/// itself at the end of the frame
#[derive(Debug, Clone, Default)]
pub struct ActionCreateAction {
    base: Action,
    prototype: Member<String>,
    instance_name: Member<String>,
}

attributed!(ActionCreateAction: Action => base);

impl ActionCreateAction {
    pub const PROTOTYPE: &'static str = "Prototype";
    pub const INSTANCE_NAME: &'static str = "InstanceName";

    pub fn new(prototype: impl Into<String>, instance_name: impl Into<String>) -> Self {
        Self {
            base: Action::default(),
            prototype: Member::scalar(prototype.into()),
            instance_name: Member::scalar(instance_name.into()),
        }
    }

    pub fn prototype(&self) -> String {
        self.prototype.value()
    }

    pub fn instance_name(&self) -> String {
        self.instance_name.value()
    }
}

impl Attributed for ActionCreateAction {
    fn signatures() -> Vec<Signature> {
        vec![
            Signature::external(Self::PROTOTYPE, 1, |a: &ActionCreateAction| &a.prototype),
            Signature::external(Self::INSTANCE_NAME, 1, |a: &ActionCreateAction| &a.instance_name),
        ]
    }
}

/// Destroys the sibling action named `Target` at the end of the frame
#[derive(Debug, Clone, Default)]
pub struct ActionDestroyAction {
    base: Action,
    target: Member<String>,
}

attributed!(ActionDestroyAction: Action => base);

impl ActionDestroyAction {
    pub const TARGET: &'static str = "Target";

    pub fn new(target: impl Into<String>) -> Self {
        Self {
            base: Action::default(),
            target: Member::scalar(target.into()),
        }
    }

    pub fn target(&self) -> String {
        self.target.value()
    }
}

impl Attributed for ActionDestroyAction {
    fn signatures() -> Vec<Signature> {
        vec![Signature::external(Self::TARGET, 1, |a: &ActionDestroyAction| &a.target)]
    }
}

/// Queues an [`EventMessage`] of kind `Subtype`, due `Delay` milliseconds
/// later. The action's auxiliary attributes travel as arguments.
#[derive(Debug, Clone, Default)]
pub struct ActionEvent {
    base: Action,
    subtype: Member<String>,
    delay: Member<i32>,
}

attributed!(ActionEvent: Action => base);

impl ActionEvent {
    pub const SUBTYPE: &'static str = "Subtype";
    pub const DELAY: &'static str = "Delay";

    pub fn new(subtype: impl Into<String>, delay_ms: i32) -> Self {
        Self {
            base: Action::default(),
            subtype: Member::scalar(subtype.into()),
            delay: Member::scalar(delay_ms),
        }
    }

    pub fn subtype(&self) -> String {
        self.subtype.value()
    }

    /// Delay in milliseconds; negative values mean none
    pub fn delay(&self) -> Duration {
        Duration::from_millis(u64::try_from(self.delay.value()).unwrap_or(0))
    }
}

impl Attributed for ActionEvent {
    fn signatures() -> Vec<Signature> {
        vec![
            Signature::external(Self::SUBTYPE, 1, |a: &ActionEvent| &a.subtype),
            Signature::external(Self::DELAY, 1, |a: &ActionEvent| &a.delay),
        ]
    }
}

pub(crate) fn update_noop(_ctx: &mut WorldContext<'_>, _id: ScopeId) -> Result<()> {
    Ok(())
}

pub(crate) fn update_list(ctx: &mut WorldContext<'_>, id: ScopeId) -> Result<()> {
    ctx.run_actions(id, ActionList::ACTIONS)
}

pub(crate) fn update_list_if(ctx: &mut WorldContext<'_>, id: ScopeId) -> Result<()> {
    let branch = if ctx.object::<ActionListIf>(id)?.condition() != 0 {
        ActionListIf::THEN
    } else {
        ActionListIf::ELSE
    };
    ctx.run_actions(id, branch)
}

pub(crate) fn update_increment(ctx: &mut WorldContext<'_>, id: ScopeId) -> Result<()> {
    let (target, step) = {
        let action = ctx.object::<ActionIncrement>(id)?;
        (action.target(), action.step())
    };
    let owner = ctx
        .arena
        .search(id, &target)
        .map(|(owner, _)| owner)
        .ok_or_else(|| WorldError::UnresolvedTarget {
            action: id,
            target: target.clone(),
        })?;

    let datum = ctx.arena.scope_mut(owner)?.at_mut(&target)?;
    match datum.datum_type() {
        DatumType::Integer => {
            if step.fract() != 0.0 || !step.is_finite() {
                return Err(WorldError::FractionalStep { target, step });
            }
            let value: i32 = datum.get(0)?;
            datum.set(value.wrapping_add(step as i32), 0)?;
        }
        DatumType::Float => {
            let value: f32 = datum.get(0)?;
            datum.set(value + step, 0)?;
        }
        found => return Err(WorldError::NotNumeric { target, found }),
    }
    Ok(())
}

pub(crate) fn update_create_action(ctx: &mut WorldContext<'_>, id: ScopeId) -> Result<()> {
    let (class, name) = {
        let action = ctx.object::<ActionCreateAction>(id)?;
        (action.prototype(), action.instance_name())
    };
    let (parent, key) = ctx.slot_of(id)?;
    ctx.state.defer_create(PendingCreate {
        parent,
        key,
        class,
        name,
    });
    Ok(())
}

pub(crate) fn update_destroy_action(ctx: &mut WorldContext<'_>, id: ScopeId) -> Result<()> {
    let name = ctx.object::<ActionDestroyAction>(id)?.target();
    let (parent, key) = ctx.slot_of(id)?;
    ctx.state.defer_destroy(PendingDestroy { parent, key, name });
    Ok(())
}

pub(crate) fn update_event(ctx: &mut WorldContext<'_>, id: ScopeId) -> Result<()> {
    let (subtype, delay) = {
        let action = ctx.object::<ActionEvent>(id)?;
        (action.subtype(), action.delay())
    };
    let scope = ctx.arena.scope(id)?;
    let arguments = scope
        .auxiliary_attributes()
        .into_iter()
        .filter_map(|key| {
            let datum = scope.find(key)?;
            EventArgument::capture(key, datum).transpose()
        })
        .collect::<void_reflect::Result<Vec<_>>>()?;

    log::trace!("Queueing '{}' with {} arguments, delay {:?}", subtype, arguments.len(), delay);
    ctx.queue.enqueue(
        EventEnvelope::new(EventMessage::new(subtype, arguments)),
        &ctx.state.time,
        delay,
    );
    Ok(())
}
