//! Event messages and the reactions that respond to them

use crate::action::ActionList;
use crate::context::WorldContext;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use void_core::rtti;
use void_reflect::{
    attributed, Attributed, Datum, DatumType, ReflectError, Scope, ScopeId, Signature,
};

/// One named argument of an [`EventMessage`], in textual form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventArgument {
    pub name: String,
    pub datum_type: DatumType,
    pub values: Vec<String>,
}

impl EventArgument {
    pub fn new(name: impl Into<String>, datum_type: DatumType, values: Vec<String>) -> Self {
        Self {
            name: name.into(),
            datum_type,
            values,
        }
    }

    /// Snapshot `datum` as an argument. Handles to scopes, objects and
    /// other datums do not leave the arena and yield `None`.
    pub fn capture(name: &str, datum: &Datum) -> void_reflect::Result<Option<Self>> {
        match datum.datum_type() {
            DatumType::Unknown | DatumType::Table | DatumType::Pointer | DatumType::Reference => {
                log::debug!("Skipping event argument '{}' of type {}", name, datum.datum_type());
                Ok(None)
            }
            datum_type => {
                let values = (0..datum.size())
                    .map(|index| datum.to_string(index))
                    .collect::<void_reflect::Result<Vec<_>>>()?;
                Ok(Some(Self::new(name, datum_type, values)))
            }
        }
    }

    /// Write this argument into `scope` as an auxiliary attribute,
    /// replacing its previous values
    pub fn write_to(&self, scope: &mut Scope) -> void_reflect::Result<()> {
        let datum = scope.append_auxiliary_attribute(&self.name)?;
        match datum.datum_type() {
            DatumType::Unknown => datum.set_type(self.datum_type)?,
            current if current != self.datum_type => {
                return Err(ReflectError::TypeMismatch {
                    expected: current,
                    found: self.datum_type,
                })
            }
            _ => {}
        }
        datum.resize(self.values.len())?;
        for (index, value) in self.values.iter().enumerate() {
            datum.set_from_string(value, index)?;
        }
        Ok(())
    }
}

/// Payload queued by [`ActionEvent`](crate::ActionEvent)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventMessage {
    subtype: String,
    arguments: Vec<EventArgument>,
}

rtti!(EventMessage);

impl EventMessage {
    pub fn new(subtype: impl Into<String>, arguments: Vec<EventArgument>) -> Self {
        Self {
            subtype: subtype.into(),
            arguments,
        }
    }

    pub fn subtype(&self) -> &str {
        &self.subtype
    }

    pub fn arguments(&self) -> &[EventArgument] {
        &self.arguments
    }

    pub fn argument(&self, name: &str) -> Option<&EventArgument> {
        self.arguments.iter().find(|arg| arg.name == name)
    }
}

/// Action list that runs only when an [`EventMessage`] with one of its
/// `Subtypes` arrives. The message arguments are copied onto the reaction
/// first, so its actions can read them by name.
#[derive(Debug, Clone, Default)]
pub struct Reaction {
    base: ActionList,
}

attributed!(Reaction: ActionList => base);

impl Reaction {
    /// String attribute listing the subtypes this reaction handles
    pub const SUBTYPES: &'static str = "Subtypes";

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            base: ActionList::new(name),
        }
    }

    pub fn name(&self) -> String {
        self.base.name()
    }
}

impl Attributed for Reaction {
    fn signatures() -> Vec<Signature> {
        vec![Signature::internal(Self::SUBTYPES, DatumType::String, 0)]
    }
}

/// Run reaction `id` if it handles `message`. Returns whether it ran.
pub(crate) fn react(ctx: &mut WorldContext<'_>, id: ScopeId, message: &EventMessage) -> Result<bool> {
    let handles = ctx
        .arena
        .scope(id)?
        .at(Reaction::SUBTYPES)?
        .find(&message.subtype().to_string())?
        .is_some();
    if !handles {
        return Ok(false);
    }

    log::trace!("{:?} reacting to '{}'", id, message.subtype());
    let scope = ctx.arena.scope_mut(id)?;
    for argument in message.arguments() {
        argument.write_to(scope)?;
    }
    ctx.run_actions(id, ActionList::ACTIONS)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Action;
    use void_reflect::{RttiType, ScopeArena, TypeManager};

    #[test]
    fn test_capture_and_write_round_trip() {
        let mut source = Datum::new();
        source.push_back(3).unwrap();
        source.push_back(4).unwrap();
        let argument = EventArgument::capture("Damage", &source).unwrap().unwrap();
        assert_eq!(argument.datum_type, DatumType::Integer);
        assert_eq!(argument.values, vec!["3", "4"]);

        let mut scope = Scope::new();
        argument.write_to(&mut scope).unwrap();
        assert_eq!(scope.at("Damage").unwrap().to_vec::<i32>().unwrap(), vec![3, 4]);

        let mismatched = EventArgument::new("Damage", DatumType::Float, vec![String::from("1.5")]);
        assert!(matches!(
            mismatched.write_to(&mut scope),
            Err(ReflectError::TypeMismatch { .. })
        ));
        assert_eq!(scope.at("Damage").unwrap().size(), 2);
    }

    #[test]
    fn test_handles_are_not_captured() {
        let datum = Datum::with_type(DatumType::Table);
        assert_eq!(EventArgument::capture("Children", &datum).unwrap(), None);
    }

    #[test]
    fn test_reaction_schema() {
        let mut types = TypeManager::new();
        types.register::<Action>().unwrap();
        types.register::<ActionList>().unwrap();
        types.register::<Reaction>().unwrap();

        let mut arena = ScopeArena::new();
        let id = arena.create_attributed(&types, Reaction::new("OnHit")).unwrap();
        let scope = arena.scope(id).unwrap();
        assert!(scope.is(ActionList::TYPE_ID));
        assert_eq!(scope.at(Reaction::SUBTYPES).unwrap().datum_type(), DatumType::String);
        assert_eq!(arena.object::<Reaction>(id).unwrap().name(), "OnHit");
    }

    #[test]
    fn test_message_lookup() {
        let message = EventMessage::new(
            "Hit",
            vec![EventArgument::new("Damage", DatumType::Integer, vec![String::from("5")])],
        );
        assert_eq!(message.subtype(), "Hit");
        assert!(message.argument("Damage").is_some());
        assert!(message.argument("Heal").is_none());
    }
}
