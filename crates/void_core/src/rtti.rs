//! Runtime type identity
//!
//! Every polymorphic participant in the engine exposes a stable numeric type
//! id, can answer "is this an instance of type X (or of something derived
//! from X)", and supports virtual `equals`/`describe`. Ids are computed at
//! compile time from the module path and type name, so they are identical
//! across runs and never collide with [`RttiId::ROOT`].

use core::any::Any;
use core::fmt;
use alloc::string::String;

/// Numeric identity of a reflected type
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RttiId(u64);

impl RttiId {
    /// Sentinel meaning "no parent"
    pub const ROOT: Self = Self(0);

    const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

    /// Derive an id from a fully qualified type name (FNV-1a)
    pub const fn of_name(name: &str) -> Self {
        let bytes = name.as_bytes();
        let mut hash = Self::FNV_OFFSET;
        let mut i = 0;
        while i < bytes.len() {
            hash ^= bytes[i] as u64;
            hash = hash.wrapping_mul(Self::FNV_PRIME);
            i += 1;
        }
        // Zero is reserved for ROOT
        if hash == 0 {
            hash = Self::FNV_OFFSET;
        }
        Self(hash)
    }

    /// Build from raw bits
    #[inline]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw numeric value
    #[inline]
    pub const fn to_raw(self) -> u64 {
        self.0
    }

    /// Check for the root sentinel
    #[inline]
    pub const fn is_root(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for RttiId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            write!(f, "RttiId(root)")
        } else {
            write!(f, "RttiId({:#018x})", self.0)
        }
    }
}

impl fmt::Display for RttiId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

/// Static type information, implemented by [`rtti!`]
pub trait RttiType: 'static {
    /// This type's id
    const TYPE_ID: RttiId;
    /// Short type name
    const TYPE_NAME: &'static str;
    /// Declared parent, or [`RttiId::ROOT`]
    const PARENT_ID: RttiId;

    /// True if `id` is this type or any declared ancestor
    fn type_is(id: RttiId) -> bool;
}

/// Object-safe runtime type interface
pub trait Rtti: Any + fmt::Debug {
    /// Dynamic type id
    fn rtti_id(&self) -> RttiId;

    /// Dynamic type name
    fn rtti_name(&self) -> &'static str;

    /// True if this object is of type `id` or derives from it
    fn is(&self, id: RttiId) -> bool;

    /// Get as Any reference (for downcasting)
    fn as_any(&self) -> &dyn Any;

    /// Value equality. Defaults to identity.
    fn equals(&self, other: &dyn Rtti) -> bool {
        core::ptr::eq(
            self.as_any() as *const dyn Any as *const (),
            other.as_any() as *const dyn Any as *const (),
        )
    }

    /// Textual representation
    fn describe(&self) -> String {
        String::from(self.rtti_name())
    }
}

impl dyn Rtti {
    /// `is` against a static type
    pub fn is_type<T: RttiType>(&self) -> bool {
        self.is(T::TYPE_ID)
    }

    /// Downcast to the concrete type
    pub fn downcast_ref<T: Rtti>(&self) -> Option<&T> {
        self.as_any().downcast_ref()
    }
}

/// Implement [`RttiType`] and [`Rtti`] for a type.
///
/// ```ignore
/// rtti!(Shape);
/// rtti!(Circle: Shape);
/// rtti!(Square: Shape {
///     fn describe(&self) -> String { format!("Square({})", self.side) }
/// });
/// ```
///
/// The optional block is spliced into the `Rtti` impl, which is how a type
/// overrides `equals` or `describe`.
#[macro_export]
macro_rules! rtti {
    (@type $ty:ident, $parent_id:expr, $parent_is:expr) => {
        impl $crate::RttiType for $ty {
            const TYPE_ID: $crate::RttiId =
                $crate::RttiId::of_name(concat!(module_path!(), "::", stringify!($ty)));
            const TYPE_NAME: &'static str = stringify!($ty);
            const PARENT_ID: $crate::RttiId = $parent_id;

            fn type_is(id: $crate::RttiId) -> bool {
                id == <Self as $crate::RttiType>::TYPE_ID || ($parent_is)(id)
            }
        }
    };
    (@object $ty:ident { $($body:tt)* }) => {
        impl $crate::Rtti for $ty {
            fn rtti_id(&self) -> $crate::RttiId {
                <Self as $crate::RttiType>::TYPE_ID
            }

            fn rtti_name(&self) -> &'static str {
                <Self as $crate::RttiType>::TYPE_NAME
            }

            fn is(&self, id: $crate::RttiId) -> bool {
                <Self as $crate::RttiType>::type_is(id)
            }

            fn as_any(&self) -> &dyn ::core::any::Any {
                self
            }

            $($body)*
        }
    };
    ($ty:ident) => {
        $crate::rtti!(@type $ty, $crate::RttiId::ROOT, |_: $crate::RttiId| false);
        $crate::rtti!(@object $ty {});
    };
    ($ty:ident { $($body:tt)* }) => {
        $crate::rtti!(@type $ty, $crate::RttiId::ROOT, |_: $crate::RttiId| false);
        $crate::rtti!(@object $ty { $($body)* });
    };
    ($ty:ident : $parent:ty) => {
        $crate::rtti!(@type $ty, <$parent as $crate::RttiType>::TYPE_ID, <$parent as $crate::RttiType>::type_is);
        $crate::rtti!(@object $ty {});
    };
    ($ty:ident : $parent:ty { $($body:tt)* }) => {
        $crate::rtti!(@type $ty, <$parent as $crate::RttiType>::TYPE_ID, <$parent as $crate::RttiType>::type_is);
        $crate::rtti!(@object $ty { $($body)* });
    };
}
