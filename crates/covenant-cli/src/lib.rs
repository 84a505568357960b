//! # covenant-cli — Scenario Runner for the Obligation Engine
//!
//! Provides the `covenant` command-line interface.
//!
//! ## Subcommands
//!
//! - `covenant run <scenario.yaml>`: replay a scenario against a fresh
//!   in-memory engine on a manual clock and print the resulting
//!   obligations, events, and payments as JSON.
//! - `covenant table [--kind <kind>] [--json]`: print the lifecycle edge
//!   table.
//!
//! ```bash
//! covenant run scenarios/recurring_bill.yaml --pretty
//! covenant table --kind claim
//! ```

pub mod simulate;
pub mod table;
