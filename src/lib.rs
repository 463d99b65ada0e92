//! Stratus - resource convergence and incidental resource cleanup for
//! multi-provider compute clients.
//!
//! The crate provides three layers:
//!
//! - [`poll`]: a bounded retry loop with a deterministic attempt schedule
//! - [`convergence`]: waiting for a provider resource to reach a target state
//! - [`reaper`]: deleting the security groups and key pairs left behind by
//!   destroyed nodes
//!
//! [`compute`] ties them together behind a facade, and [`provider`] defines
//! the narrow ports a provider client implements.

pub mod cache;
pub mod cli;
pub mod compute;
pub mod config;
pub mod convergence;
pub mod logging;
pub mod poll;
pub mod provider;
pub mod reaper;
