//! Deterministic synthetic data generators backing the canonical tools
//! (spec §4.5: real market-data providers are out-of-scope externals,
//! so each tool ships a simulated backend instead — matching how the
//! teacher ships `crates/hello-node` as a stand-in for an out-of-scope
//! integration rather than a live vendor call).
//!
//! Every generator is seeded from a hash of its input so the same query
//! always produces the same synthetic result, which keeps tests stable
//! without needing network access or fixtures.

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

pub fn seeded_rng(seed_text: &str) -> StdRng {
    let mut hasher = DefaultHasher::new();
    seed_text.hash(&mut hasher);
    StdRng::seed_from_u64(hasher.finish())
}
