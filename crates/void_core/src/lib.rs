//! # void_core - Void Engine Core
//!
//! Zero-dependency primitives shared by every other crate in the workspace:
//! - **RTTI**: stable numeric type identities, `is` checks along a declared
//!   parent chain, and the object-safe [`Rtti`] trait used for dynamic
//!   dispatch of `equals`/`describe`
//! - **Handles**: generational indices into a [`HandleMap`] arena, used to
//!   address nodes without raw pointers

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std as alloc;

pub mod handle;
pub mod rtti;

pub use handle::*;
pub use rtti::*;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::handle::{Handle, HandleMap};
    pub use crate::rtti::{Rtti, RttiId, RttiType};
}
