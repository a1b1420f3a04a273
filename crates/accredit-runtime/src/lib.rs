//! # accredit-runtime
//!
//! Default wiring for the compliance tracker.
//!
//! [`Runtime`] assembles the in-memory store, a blob store (filesystem when
//! `storage.blob_dir` is set), the hash-chained audit log, the TOML access
//! policy and the rule validator behind one `ComplianceService`.
//! [`load_config`] reads the `AppConfig` from TOML, and [`scenario`] seeds a
//! small fictional data set used by the demo CLI.

pub mod config;
pub mod runtime;
pub mod scenario;

pub use config::{load_config, parse_config};
pub use runtime::Runtime;
pub use scenario::{run_scenario, scenario_admin, seed, ScenarioReport, SeededScenario};
