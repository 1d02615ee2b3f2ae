//! Pure layout logic for HabPlan.
//!
//! This crate contains everything about a habitat floor plan that is
//! independent of any canvas, scene graph, or UI toolkit. Functions take
//! plain data and return results, so the editor front-end, the headless
//! harness and the tests all drive the same code.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`catalog`] | Main/sub-module type definitions and port compatibility |
//! | [`config`] | Validation thresholds and editor settings |
//! | [`constants`] | Default thresholds and id prefixes |
//! | [`editor`] | Copy-on-write layout mutations and the editing session |
//! | [`geometry`] | Rotation, footprints, overlap tests, port positions |
//! | [`layout`] | Placed modules, connections and the layout aggregate |
//! | [`persistence`] | JSON save/load of layouts |
//! | [`validation`] | Rule-based layout validator producing findings |

pub mod catalog;
pub mod config;
pub mod constants;
pub mod editor;
pub mod geometry;
pub mod layout;
pub mod persistence;
pub mod validation;

pub use catalog::{are_ports_compatible, Catalog, MainModuleType, PortType, SubModuleType};
pub use layout::{Connection, LayoutState, PlacedMainModule, PlacedSubModule};
pub use validation::{can_switch_to_3d, validate, validate_with, Finding, ModeGate, Severity};
