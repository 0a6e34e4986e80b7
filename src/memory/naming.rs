//! Deterministic auto-naming.
//!
//! Generated names are derived from the engine-supplied random seed and the
//! resource URN, so repeated runs of the same program produce the same name.

use sha2::{Digest, Sha256};

use crate::resource::Urn;

/// Number of hex characters appended to generated names.
pub const SUFFIX_LEN: usize = 7;

/// Generates `<urn name>-<suffix>` from the seed and URN.
#[must_use]
pub fn auto_name(urn: &Urn, seed: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(seed);
    hasher.update(urn.as_str().as_bytes());
    let digest = hex::encode(hasher.finalize());

    format!("{}-{}", urn.name(), &digest[..SUFFIX_LEN])
}
