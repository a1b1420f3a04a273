//! # accredit-store
//!
//! Persistence collaborators for the compliance tracker.
//!
//! - [`MemoryStore`] implements every repository trait from `accredit-core`
//!   over per-table locks. Row modifications are atomic with respect to one
//!   another, which is what keeps revocation exactly-once.
//! - [`MemoryBlobStore`] and [`FsBlobStore`] hold evidence files.

pub mod blob;
pub mod memory;

pub use blob::{FsBlobStore, MemoryBlobStore};
pub use memory::MemoryStore;

// ── Tests ─────────────────────────────────────────────────────────────────────
