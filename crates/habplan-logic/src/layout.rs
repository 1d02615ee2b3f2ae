//! The layout document: placed modules, port connections and crew size.
//!
//! Placed records carry a full copy of their catalogue type (flattened into
//! the same JSON object), so a saved layout is self-contained. References
//! between records (`parent_instance_id`, connection endpoints) are plain
//! ids and may dangle; the validator reports that rather than rejecting it.

use crate::catalog::{Anchor, MainModuleType, SubModuleType};
use crate::constants::DEFAULT_CREW_SIZE;
use crate::geometry::Rotation;
use serde::{Deserialize, Serialize};

/// A main module instance on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedMainModule {
    pub instance_id: String,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub rotation: Rotation,
    #[serde(flatten)]
    pub module_type: MainModuleType,
}

impl PlacedMainModule {
    pub fn type_id(&self) -> &str {
        &self.module_type.id
    }
}

/// A sub-module instance. `x`/`y` are relative to the parent's origin and
/// `z` is the height above the parent's floor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedSubModule {
    pub instance_id: String,
    pub parent_instance_id: String,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor: Option<Anchor>,
    #[serde(flatten)]
    pub module_type: SubModuleType,
}

impl PlacedSubModule {
    pub fn type_id(&self) -> &str {
        &self.module_type.id
    }
}

/// An undirected edge between two main-module ports.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub id: String,
    pub from_module_id: String,
    pub from_port_id: String,
    pub to_module_id: String,
    pub to_port_id: String,
}

impl Connection {
    /// Whether `(module_id, port_id)` is either endpoint.
    pub fn uses_port(&self, module_id: &str, port_id: &str) -> bool {
        (self.from_module_id == module_id && self.from_port_id == port_id)
            || (self.to_module_id == module_id && self.to_port_id == port_id)
    }

    pub fn touches(&self, module_id: &str) -> bool {
        self.from_module_id == module_id || self.to_module_id == module_id
    }
}

/// Structural layout state. Selection and zoom live in
/// [`crate::editor::Selection`], never here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutState {
    pub crew_size: u32,
    #[serde(default)]
    pub main_modules: Vec<PlacedMainModule>,
    #[serde(default)]
    pub sub_modules: Vec<PlacedSubModule>,
    #[serde(default)]
    pub connections: Vec<Connection>,
}

impl Default for LayoutState {
    fn default() -> Self {
        Self::new(DEFAULT_CREW_SIZE)
    }
}

impl LayoutState {
    pub fn new(crew_size: u32) -> Self {
        Self {
            crew_size,
            main_modules: Vec::new(),
            sub_modules: Vec::new(),
            connections: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.main_modules.is_empty()
    }

    pub fn main_module(&self, instance_id: &str) -> Option<&PlacedMainModule> {
        self.main_modules
            .iter()
            .find(|m| m.instance_id == instance_id)
    }

    pub fn sub_module(&self, instance_id: &str) -> Option<&PlacedSubModule> {
        self.sub_modules.iter().find(|s| s.instance_id == instance_id)
    }

    /// Sub-modules whose parent is `parent_id`.
    pub fn children_of<'a>(
        &'a self,
        parent_id: &'a str,
    ) -> impl Iterator<Item = &'a PlacedSubModule> + 'a {
        self.sub_modules
            .iter()
            .filter(move |s| s.parent_instance_id == parent_id)
    }

    /// Connections with `module_id` at either end.
    pub fn connections_of<'a>(
        &'a self,
        module_id: &'a str,
    ) -> impl Iterator<Item = &'a Connection> + 'a {
        self.connections.iter().filter(move |c| c.touches(module_id))
    }

    /// Whether any connection already uses this port.
    pub fn port_in_use(&self, module_id: &str, port_id: &str) -> bool {
        self.connections
            .iter()
            .any(|c| c.uses_port(module_id, port_id))
    }

    /// Smallest free id of the form `<prefix>-<n>`, n starting at 1.
    /// Checked against main modules, sub-modules and connections.
    pub fn next_instance_id(&self, prefix: &str) -> String {
        let taken = |id: &str| {
            self.main_modules.iter().any(|m| m.instance_id == id)
                || self.sub_modules.iter().any(|s| s.instance_id == id)
                || self.connections.iter().any(|c| c.id == id)
        };
        let mut n = 1u32;
        loop {
            let candidate = format!("{prefix}-{n}");
            if !taken(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    /// Sum of main-module volumes (m³).
    pub fn total_volume(&self) -> f64 {
        self.main_modules.iter().map(|m| m.module_type.volume).sum()
    }
}

/// Aggregates for the 3D/export preview.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutSummary {
    pub crew_size: u32,
    pub main_module_count: usize,
    pub sub_module_count: usize,
    pub connection_count: usize,
    /// Pressurized volume (m³).
    pub total_volume: f64,
    /// Main plus sub-module mass (kg); types without a mass count as 0.
    pub total_mass: f64,
    /// Volume per crew member, 0 when crew size is 0.
    pub volume_per_crew: f64,
}

pub fn summarize(state: &LayoutState) -> LayoutSummary {
    let total_volume = state.total_volume();
    let main_mass: f64 = state
        .main_modules
        .iter()
        .filter_map(|m| m.module_type.mass)
        .sum();
    let sub_mass: f64 = state
        .sub_modules
        .iter()
        .filter_map(|s| s.module_type.mass)
        .sum();
    let volume_per_crew = if state.crew_size == 0 {
        0.0
    } else {
        total_volume / state.crew_size as f64
    };

    LayoutSummary {
        crew_size: state.crew_size,
        main_module_count: state.main_modules.len(),
        sub_module_count: state.sub_modules.len(),
        connection_count: state.connections.len(),
        total_volume,
        total_mass: main_mass + sub_mass,
        volume_per_crew,
    }
}
