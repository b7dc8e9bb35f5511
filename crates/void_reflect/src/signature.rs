//! Attribute signatures
//!
//! A [`Signature`] declares one prescribed attribute of an attributed type:
//! its name, element type, element count and where its storage lives.
//! External signatures carry an accessor that picks a [`Member`] out of the
//! declaring type, so binding is recomputed per instance instead of relying
//! on a fixed layout.

use crate::datum::storage::ExternalView;
use crate::datum::{DatumElement, DatumType};
use crate::member::Member;
use std::any::Any;
use std::fmt;
use std::rc::Rc;
use void_core::RttiId;

type Accessor = Rc<dyn Fn(&dyn Any) -> Option<ExternalView>>;

#[derive(Clone)]
pub(crate) enum Binding {
    /// Storage owned by the datum
    Internal,
    /// View over a member of the declaring object
    External(Accessor),
}

/// Schema entry for one prescribed attribute
#[derive(Clone)]
pub struct Signature {
    name: String,
    datum_type: DatumType,
    size: usize,
    binding: Binding,
    owner: RttiId,
}

impl Signature {
    /// Attribute whose datum owns its storage, reserved to `size` elements
    pub fn internal(name: impl Into<String>, datum_type: DatumType, size: usize) -> Self {
        Self {
            name: name.into(),
            datum_type,
            size,
            binding: Binding::Internal,
            owner: RttiId::ROOT,
        }
    }

    /// Attribute viewing `size` elements of the member `accessor` returns.
    ///
    /// `T` is the type declaring the member; for a derived type the
    /// accessor is applied to the embedded base, not to the derived object.
    pub fn external<T, E, F>(name: impl Into<String>, size: usize, accessor: F) -> Self
    where
        T: Any,
        E: DatumElement,
        F: Fn(&T) -> &Member<E> + 'static,
    {
        let accessor: Accessor = Rc::new(move |object: &dyn Any| {
            object
                .downcast_ref::<T>()
                .and_then(|object| E::external(accessor(object).cells()))
        });
        Self {
            name: name.into(),
            datum_type: E::DATUM_TYPE,
            size,
            binding: Binding::External(accessor),
            owner: RttiId::ROOT,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn datum_type(&self) -> DatumType {
        self.datum_type
    }

    /// Declared element count
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_external(&self) -> bool {
        matches!(self.binding, Binding::External(_))
    }

    pub fn is_internal(&self) -> bool {
        !self.is_external()
    }

    /// Type that declared this signature; set on registration
    pub fn owner(&self) -> RttiId {
        self.owner
    }

    pub(crate) fn with_owner(mut self, owner: RttiId) -> Self {
        self.owner = owner;
        self
    }

    /// Resolve the member view on `object`, which must be the owner type
    pub(crate) fn bind(&self, object: &dyn Any) -> Option<ExternalView> {
        match &self.binding {
            Binding::External(accessor) => accessor(object),
            Binding::Internal => None,
        }
    }
}

impl PartialEq for Signature {
    /// Structural: accessors are not compared, only the storage kind
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.datum_type == other.datum_type
            && self.size == other.size
            && self.is_external() == other.is_external()
            && self.owner == other.owner
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signature")
            .field("name", &self.name)
            .field("type", &self.datum_type)
            .field("size", &self.size)
            .field("external", &self.is_external())
            .field("owner", &self.owner)
            .finish()
    }
}
