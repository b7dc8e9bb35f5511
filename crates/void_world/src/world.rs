//! World, sector and entity containers
//!
//! A world holds sectors, a sector holds entities and an entity holds
//! actions. Each level is an attributed type whose children live in an
//! internal table attribute.

use void_reflect::{attributed, Attributed, DatumType, Member, Signature};

/// Attribute holding a container's name
pub const NAME_KEY: &str = "Name";

/// Root of the scene graph
#[derive(Debug, Clone, Default)]
pub struct World {
    name: Member<String>,
}

attributed!(World {
    fn describe(&self) -> String {
        format!("World({})", self.name.value())
    }
});

impl World {
    /// Table attribute holding sectors
    pub const SECTORS: &'static str = "Sectors";

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Member::scalar(name.into()),
        }
    }

    pub fn name(&self) -> String {
        self.name.value()
    }
}

impl Attributed for World {
    fn signatures() -> Vec<Signature> {
        vec![
            Signature::external(NAME_KEY, 1, |w: &World| &w.name),
            Signature::internal(Self::SECTORS, DatumType::Table, 0),
        ]
    }
}

/// Group of entities
#[derive(Debug, Clone, Default)]
pub struct Sector {
    name: Member<String>,
}

attributed!(Sector {
    fn describe(&self) -> String {
        format!("Sector({})", self.name.value())
    }
});

impl Sector {
    /// Table attribute holding entities
    pub const ENTITIES: &'static str = "Entities";

    pub fn name(&self) -> String {
        self.name.value()
    }
}

impl Attributed for Sector {
    fn signatures() -> Vec<Signature> {
        vec![
            Signature::external(NAME_KEY, 1, |s: &Sector| &s.name),
            Signature::internal(Self::ENTITIES, DatumType::Table, 0),
        ]
    }
}

/// Named owner of actions
#[derive(Debug, Clone, Default)]
pub struct Entity {
    name: Member<String>,
}

attributed!(Entity {
    fn describe(&self) -> String {
        format!("Entity({})", self.name.value())
    }
});

impl Entity {
    /// Table attribute holding actions
    pub const ACTIONS: &'static str = "Actions";

    pub fn name(&self) -> String {
        self.name.value()
    }
}

impl Attributed for Entity {
    fn signatures() -> Vec<Signature> {
        vec![
            Signature::external(NAME_KEY, 1, |e: &Entity| &e.name),
            Signature::internal(Self::ACTIONS, DatumType::Table, 0),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use void_reflect::{Rtti, ScopeArena, TypeManager};

    #[test]
    fn test_name_is_bound_to_member() {
        let mut types = TypeManager::new();
        types.register::<World>().unwrap();

        let mut arena = ScopeArena::new();
        let id = arena.create_attributed(&types, World::new("Overworld")).unwrap();
        let scope = arena.scope(id).unwrap();
        assert_eq!(scope.at(NAME_KEY).unwrap().get::<String>(0).unwrap(), "Overworld");
        assert_eq!(scope.at(World::SECTORS).unwrap().datum_type(), DatumType::Table);

        arena
            .scope_mut(id)
            .unwrap()
            .at_mut(NAME_KEY)
            .unwrap()
            .set(String::from("Underworld"), 0)
            .unwrap();
        let world = arena.object::<World>(id).unwrap();
        assert_eq!(world.name(), "Underworld");
        assert_eq!(world.describe(), "World(Underworld)");
    }
}
