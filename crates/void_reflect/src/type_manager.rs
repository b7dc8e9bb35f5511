//! Registry of attributed type schemas
//!
//! The [`TypeManager`] maps a type id to the signatures that type declares
//! and its parent id. It is an ordinary value: create one, register every
//! attributed type base-first, and pass it by reference to anything that
//! constructs attributed objects.

use crate::attributed::Attributed;
use crate::datum::DatumType;
use crate::error::{ReflectError, Result};
use crate::signature::Signature;
use crate::THIS_KEY;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use void_core::RttiId;

/// Registered schema for one type
#[derive(Clone, Debug)]
pub struct TypeInfo {
    /// Type name, for diagnostics
    pub name: String,
    /// Declared parent, or [`RttiId::ROOT`]
    pub parent: RttiId,
    /// Signatures declared by this type alone
    pub signatures: Vec<Signature>,
}

/// Type id → (signatures, parent) registry
pub struct TypeManager {
    types: HashMap<RttiId, TypeInfo>,
    /// Flattened lists, invalidated whenever the registry changes
    flattened: std::cell::RefCell<HashMap<RttiId, Rc<[Signature]>>>,
}

impl TypeManager {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            types: HashMap::new(),
            flattened: Default::default(),
        }
    }

    /// Register an attributed type. Its parent must already be registered.
    pub fn register<T: Attributed>(&mut self) -> Result<()> {
        self.register_raw(T::TYPE_ID, T::TYPE_NAME, T::signatures(), T::PARENT_ID)
    }

    /// Register a type by id
    pub fn register_raw(
        &mut self,
        id: RttiId,
        name: impl Into<String>,
        signatures: Vec<Signature>,
        parent: RttiId,
    ) -> Result<()> {
        let name = name.into();

        if id.is_root() {
            return Err(ReflectError::InvalidArgument(format!(
                "type '{}' cannot use the root id",
                name
            )));
        }
        if self.types.contains_key(&id) {
            return Err(ReflectError::DuplicateType { id, name });
        }
        if !parent.is_root() && !self.types.contains_key(&parent) {
            return Err(ReflectError::invalid_operation(format!(
                "parent {} of type '{}' is not registered",
                parent, name
            )));
        }

        let inherited = if parent.is_root() {
            Vec::new()
        } else {
            self.flatten(parent)?
        };
        for (i, sig) in signatures.iter().enumerate() {
            if sig.name().is_empty() || sig.name() == THIS_KEY {
                return Err(ReflectError::InvalidArgument(format!(
                    "type '{}' declares reserved attribute name '{}'",
                    name,
                    sig.name()
                )));
            }
            if inherited.iter().any(|s| s.name() == sig.name())
                || signatures[..i].iter().any(|s| s.name() == sig.name())
            {
                return Err(ReflectError::InvalidArgument(format!(
                    "type '{}' declares '{}' more than once in its hierarchy",
                    name,
                    sig.name()
                )));
            }
            if sig.datum_type() == DatumType::Unknown {
                return Err(ReflectError::InvalidArgument(format!(
                    "attribute '{}' of type '{}' has no datum type",
                    sig.name(),
                    name
                )));
            }
            if sig.is_external() && !sig.datum_type().supports_external() {
                return Err(ReflectError::InvalidArgument(format!(
                    "attribute '{}' of type '{}' cannot be external",
                    sig.name(),
                    name
                )));
            }
        }

        let signatures = signatures.into_iter().map(|s| s.with_owner(id)).collect();
        log::debug!("Registered type '{}' ({}) with parent {}", name, id, parent);
        self.types.insert(
            id,
            TypeInfo {
                name,
                parent,
                signatures,
            },
        );
        self.flattened.borrow_mut().clear();
        Ok(())
    }

    /// Remove a type. Types derived from it stay registered but their
    /// flattened signatures will fail to resolve.
    pub fn deregister(&mut self, id: RttiId) -> Option<TypeInfo> {
        let removed = self.types.remove(&id);
        if let Some(info) = &removed {
            log::debug!("Deregistered type '{}' ({})", info.name, id);
            self.flattened.borrow_mut().clear();
        }
        removed
    }

    /// Remove every type
    pub fn clear(&mut self) {
        self.types.clear();
        self.flattened.borrow_mut().clear();
    }

    /// Ancestor signatures then the type's own, parent-first
    pub fn signatures(&self, id: RttiId) -> Result<Rc<[Signature]>> {
        if let Some(cached) = self.flattened.borrow().get(&id) {
            return Ok(Rc::clone(cached));
        }
        let list: Rc<[Signature]> = self.flatten(id)?.into();
        self.flattened.borrow_mut().insert(id, Rc::clone(&list));
        Ok(list)
    }

    fn flatten(&self, id: RttiId) -> Result<Vec<Signature>> {
        let mut chain = Vec::new();
        let mut current = id;
        while !current.is_root() {
            let info = self
                .types
                .get(&current)
                .ok_or(ReflectError::UnknownType(current))?;
            chain.push(info);
            current = info.parent;
            if chain.len() > self.types.len() {
                return Err(ReflectError::invalid_operation(format!(
                    "parent chain of {} does not terminate",
                    id
                )));
            }
        }
        Ok(chain
            .iter()
            .rev()
            .flat_map(|info| info.signatures.iter().cloned())
            .collect())
    }

    /// Check if a type is registered
    pub fn is_registered(&self, id: RttiId) -> bool {
        self.types.contains_key(&id)
    }

    /// Registered schema for `id`
    pub fn get(&self, id: RttiId) -> Option<&TypeInfo> {
        self.types.get(&id)
    }

    /// Declared parent of `id`
    pub fn parent_of(&self, id: RttiId) -> Option<RttiId> {
        self.types.get(&id).map(|info| info.parent)
    }

    /// Registered name of `id`
    pub fn type_name(&self, id: RttiId) -> Option<&str> {
        self.types.get(&id).map(|info| info.name.as_str())
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl Default for TypeManager {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TypeManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeManager")
            .field("types", &self.types.len())
            .finish()
    }
}
