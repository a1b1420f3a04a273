//! # accredit-policy
//!
//! A TOML-driven, deny-by-default access policy for the compliance tracker.
//!
//! [`TomlAccessPolicy`] implements
//! [`AccessPolicy`](accredit_core::traits::AccessPolicy). Rules map an
//! `(action, resource)` pair to the capability roles allowed to perform it.
//! They are applied in declaration order and the first match wins; if no
//! rule matches, the request is denied.
//!
//! ```rust,ignore
//! use accredit_policy::TomlAccessPolicy;
//!
//! let policy = TomlAccessPolicy::embedded()?;
//! ```

pub mod engine;
pub mod rule;

pub use engine::{TomlAccessPolicy, DEFAULT_POLICY};
pub use rule::{AccessRule, PolicyFile, RuleVerdict};

// ── Tests ─────────────────────────────────────────────────────────────────────
