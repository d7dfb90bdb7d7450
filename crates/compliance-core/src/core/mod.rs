// crates/compliance-core/src/core/mod.rs
// ============================================================================
// Module: Compliance Core Data Model
// Description: Aggregates the domain types shared across the workspace.
// Purpose: Single import surface (`compliance_core::core::*`) for data model
//          consumers.
// Dependencies: (none beyond submodules)
// ============================================================================

pub mod auth;
pub mod config;
pub mod evidence;
pub mod identifiers;
pub mod registry;
pub mod result;
pub mod time;
