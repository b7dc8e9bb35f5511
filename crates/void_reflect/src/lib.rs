//! # void_reflect - Reflection Runtime
//!
//! Runtime-typed values and object schemas:
//! - [`Datum`]: a typed, resizable array that owns its storage or views a [`Member`]
//! - [`Scope`] / [`ScopeArena`]: ordered attribute tables forming a tree
//! - [`TypeManager`]: type id → signatures registry, registered base-first
//! - [`Attributed`]: structs whose members are bound into a scope's table
//! - [`Factory`] and [`JsonLoader`]: construction by class name and from data
//!
//! ```ignore
//! let mut types = TypeManager::new();
//! types.register::<Foo>()?;
//!
//! let mut arena = ScopeArena::new();
//! let foo = arena.create_attributed(&types, Foo::with_data(10))?;
//! assert_eq!(arena.scope(foo)?.at("Data")?.get::<i32>(0)?, 10);
//! ```

pub mod attributed;
pub mod datum;
pub mod error;
pub mod factory;
pub mod json;
pub mod member;
pub mod scope;
pub mod signature;
pub mod type_manager;

pub use attributed::{Attributed, Reflected};
pub use datum::{default_reserve_strategy, Datum, DatumElement, DatumRef, DatumType, ReserveStrategy, RttiRef};
pub use error::{ReflectError, Result};
pub use factory::Factory;
pub use json::JsonLoader;
pub use member::Member;
pub use scope::{Scope, ScopeArena, ScopeId};
pub use signature::Signature;
pub use type_manager::{TypeInfo, TypeManager};

pub use void_core::{rtti, Rtti, RttiId, RttiType};

/// Key of the self-referencing pointer attribute of attributed scopes
pub const THIS_KEY: &str = "this";

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        attributed, Attributed, Datum, DatumType, Factory, Member, ReflectError, Reflected, Rtti,
        RttiId, RttiType, Scope, ScopeArena, ScopeId, Signature, TypeManager,
    };
}
