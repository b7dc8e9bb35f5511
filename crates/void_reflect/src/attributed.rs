//! Attributed objects
//!
//! An attributed type is a plain struct whose reflected fields are
//! [`Member`](crate::Member)s. Declaring it with [`attributed!`] gives it RTTI
//! and the [`Reflected`] glue; implementing [`Attributed`] lists its own
//! signatures. [`ScopeArena::create_attributed`](crate::ScopeArena::create_attributed)
//! then builds a scope whose prescribed attributes view those members.
//!
//! ```ignore
//! #[derive(Debug, Clone, Default)]
//! struct Foo { data: Member<i32> }
//! attributed!(Foo);
//!
//! impl Attributed for Foo {
//!     fn signatures() -> Vec<Signature> {
//!         vec![Signature::external("Data", 1, |f: &Foo| &f.data)]
//!     }
//! }
//!
//! #[derive(Debug, Clone, Default)]
//! struct Bar { base: Foo, speed: Member<f32> }
//! attributed!(Bar: Foo => base);
//! ```

use crate::signature::Signature;
use std::any::Any;
use std::rc::Rc;
use void_core::{Rtti, RttiId, RttiType};

/// Object payload of an attributed scope
pub trait Reflected: Rtti {
    /// Polymorphic deep copy; members get fresh storage
    fn clone_reflected(&self) -> Rc<dyn Reflected>;

    /// This object viewed as type `id`, where `id` is its own type or one of
    /// its bases
    fn ancestor(&self, id: RttiId) -> Option<&dyn Any>;

    /// Upcast for storage in pointer datums
    fn into_rtti(self: Rc<Self>) -> Rc<dyn Rtti>;
}

/// A type with a registered attribute schema
pub trait Attributed: Reflected + RttiType + Clone {
    /// Signatures declared by this type, excluding its bases
    fn signatures() -> Vec<Signature>;
}

impl dyn Reflected {
    /// Typed view of this object or one of its bases
    pub fn ancestor_as<T: RttiType + Any>(&self) -> Option<&T> {
        self.ancestor(T::TYPE_ID)?.downcast_ref()
    }
}

/// Declare RTTI and [`Reflected`] for an attributed type.
///
/// `attributed!(Foo)` declares a root type. `attributed!(Bar: Foo => base)`
/// declares `Bar` as derived from `Foo`, with the `Foo` part stored in the
/// field `base`. An optional trailing block overrides `Rtti` methods, as with
/// [`rtti!`](void_core::rtti).
#[macro_export]
macro_rules! attributed {
    ($ty:ident $({ $($body:tt)* })?) => {
        $crate::rtti!($ty { $($($body)*)? });

        impl $crate::Reflected for $ty {
            fn clone_reflected(&self) -> ::std::rc::Rc<dyn $crate::Reflected> {
                ::std::rc::Rc::new(::std::clone::Clone::clone(self))
            }

            fn ancestor(&self, id: $crate::RttiId) -> ::std::option::Option<&dyn ::std::any::Any> {
                if id == <Self as $crate::RttiType>::TYPE_ID {
                    ::std::option::Option::Some(self)
                } else {
                    ::std::option::Option::None
                }
            }

            fn into_rtti(self: ::std::rc::Rc<Self>) -> ::std::rc::Rc<dyn $crate::Rtti> {
                self
            }
        }
    };
    ($ty:ident : $parent:ty => $base:ident $({ $($body:tt)* })?) => {
        $crate::rtti!($ty : $parent { $($($body)*)? });

        impl $crate::Reflected for $ty {
            fn clone_reflected(&self) -> ::std::rc::Rc<dyn $crate::Reflected> {
                ::std::rc::Rc::new(::std::clone::Clone::clone(self))
            }

            fn ancestor(&self, id: $crate::RttiId) -> ::std::option::Option<&dyn ::std::any::Any> {
                if id == <Self as $crate::RttiType>::TYPE_ID {
                    ::std::option::Option::Some(self)
                } else {
                    $crate::Reflected::ancestor(&self.$base, id)
                }
            }

            fn into_rtti(self: ::std::rc::Rc<Self>) -> ::std::rc::Rc<dyn $crate::Rtti> {
                self
            }
        }
    };
}
