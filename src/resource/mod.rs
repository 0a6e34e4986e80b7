//! Resource value model.
//!
//! This module provides the vocabulary every provider operation is expressed
//! in: resource identity (URNs, IDs, tokens), property values and maps, the
//! structural diff between two property maps, and operation status codes.

mod diff;
mod property;
mod status;
mod tokens;
mod urn;

pub use diff::{ArrayDiff, ObjectDiff, ValueDiff};
pub use property::{PropertyKey, PropertyMap, PropertyValue, SECRET_KEY, UNKNOWN_SENTINEL};
pub use status::Status;
pub use tokens::{ModuleMember, Package, TypeToken};
pub use urn::{ResourceId, Urn};
