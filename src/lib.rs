//! A boot-time security configuration pipeline.
//!
//! The crate drives three sealed stages, strictly bottom-up and never
//! reversed:
//!
//! ```text
//! ProbeProvider -> BootFacts -> Topology -> DomainGraph
//! ```
//!
//! Each stage is probed, validated, and sealed before the next stage
//! may borrow it. Validation never short-circuits: every check runs
//! and every finding is accumulated into a bounded
//! [`diagnostics::ValidationContext`], so a caller always sees the
//! full list of problems rather than the first one. A stage seals only
//! if no [`diagnostics::Severity::HardFail`] was recorded.
//!
//! - [`provider`] is the architecture-neutral capability boundary the
//!   core drives to gather hardware facts.
//! - [`boot`] holds the first stage, [`boot::BootFacts`].
//! - [`topology`] holds the second stage, [`topology::Topology`],
//!   which borrows a sealed [`boot::SealedBootFacts`].
//! - [`domain`] holds the third stage, [`domain::DomainGraph`], which
//!   borrows a sealed [`topology::SealedTopology`].
#![cfg_attr(not(test), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]

pub mod boot;
pub mod diagnostics;
pub mod domain;
pub mod limits;
pub mod provider;
pub mod topology;
