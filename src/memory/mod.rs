//! In-memory reference provider.
//!
//! Serves as the default provider of the `provplug` binary and as a fixture
//! for exercising the planner and executor end to end.

mod naming;
mod provider;

pub use naming::{SUFFIX_LEN, auto_name};
pub use provider::{
    ECHO_FUNCTION, ID_PROPERTY, LIST_FUNCTION, LOOKUP_FUNCTION, MemoryProvider, StoredResource,
};
