//! Module catalogue: the immutable type definitions the editor places.
//!
//! Main modules are the pressurized rooms of the habitat; sub-modules are
//! the furniture and equipment mounted inside them. Placed instances carry
//! a full copy of their type (see [`crate::layout`]), so nothing here is
//! consulted by the validator except [`are_ports_compatible`].

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Functional category of a main module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MainCategory {
    Habitation,
    Hygiene,
    Galley,
    Medical,
    Airlock,
    Storage,
    Laboratory,
    Exercise,
    Node,
}

/// Functional category of a sub-module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubCategory {
    Sleep,
    Hygiene,
    Food,
    Medical,
    Storage,
    Exercise,
    Workstation,
    Lighting,
    Eva,
}

/// Docking port standard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortType {
    #[serde(rename = "hab-port", alias = "hab")]
    Hab,
    #[serde(rename = "svc-port", alias = "svc")]
    Svc,
    #[serde(rename = "std-port", alias = "std")]
    Std,
    #[serde(rename = "airlock-port", alias = "airlock")]
    Airlock,
}

impl PortType {
    pub const ALL: [PortType; 4] = [
        PortType::Hab,
        PortType::Svc,
        PortType::Std,
        PortType::Airlock,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PortType::Hab => "hab-port",
            PortType::Svc => "svc-port",
            PortType::Std => "std-port",
            PortType::Airlock => "airlock-port",
        }
    }
}

impl fmt::Display for PortType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown port type '{0}'")]
pub struct ParsePortTypeError(pub String);

impl FromStr for PortType {
    type Err = ParsePortTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hab" | "hab-port" => Ok(PortType::Hab),
            "svc" | "svc-port" => Ok(PortType::Svc),
            "std" | "std-port" => Ok(PortType::Std),
            "airlock" | "airlock-port" => Ok(PortType::Airlock),
            _ => Err(ParsePortTypeError(s.to_string())),
        }
    }
}

/// Wall a port is mounted on, in the module's unrotated frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortSide {
    North,
    South,
    East,
    West,
}

/// Surface a sub-module can be mounted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Anchor {
    Floor,
    Wall,
    Ceiling,
}

/// A docking port on a main module. `x`/`y` are local to the module's
/// top-left corner before rotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    pub id: String,
    #[serde(rename = "type")]
    pub port_type: PortType,
    pub position: PortSide,
    pub x: f64,
    pub y: f64,
}

/// Template for a pressurized room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MainModuleType {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub category: MainCategory,
    pub width: f64,
    pub depth: f64,
    pub height: f64,
    pub volume: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mass: Option<f64>,
    #[serde(default)]
    pub ports: Vec<Port>,
    #[serde(default)]
    pub allowed_sub_modules: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_connections: Option<u32>,
}

impl MainModuleType {
    pub fn port(&self, port_id: &str) -> Option<&Port> {
        self.ports.iter().find(|p| p.id == port_id)
    }

    pub fn allows_sub_module(&self, sub_type_id: &str) -> bool {
        self.allowed_sub_modules.iter().any(|id| id == sub_type_id)
    }
}

/// Template for furniture or equipment mounted inside a main module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubModuleType {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub category: SubCategory,
    pub width: f64,
    pub depth: f64,
    pub height: f64,
    pub volume: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mass: Option<f64>,
    #[serde(default)]
    pub allowed_anchors: Vec<Anchor>,
    #[serde(default)]
    pub z_aware: bool,
}

impl SubModuleType {
    pub fn allows_anchor(&self, anchor: Anchor) -> bool {
        self.allowed_anchors.contains(&anchor)
    }
}

/// Whether two port standards can be mated.
///
/// Same type always mates, `std` mates with anything, and the only mixed
/// pair allowed otherwise is hab ↔ svc.
pub fn are_ports_compatible(a: PortType, b: PortType) -> bool {
    if a == b || a == PortType::Std || b == PortType::Std {
        return true;
    }
    matches!(
        (a, b),
        (PortType::Hab, PortType::Svc) | (PortType::Svc, PortType::Hab)
    )
}

/// Errors loading a custom catalogue.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("invalid catalog JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// A consistency problem in catalogue data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CatalogIssue {
    #[error("duplicate module type id '{0}'")]
    DuplicateTypeId(String),
    #[error("module type '{module}' declares port '{port}' more than once")]
    DuplicatePortId { module: String, port: String },
    #[error("module type '{0}' has non-positive dimensions or volume")]
    NonPositiveSize(String),
    #[error("module type '{module}' allows unknown sub-module '{sub_module}'")]
    UnknownAllowedSubModule { module: String, sub_module: String },
    #[error("sub-module type '{0}' has no mounting anchors")]
    NoAnchors(String),
}

/// The full set of placeable types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    pub main_modules: Vec<MainModuleType>,
    pub sub_modules: Vec<SubModuleType>,
}

impl Catalog {
    /// The built-in catalogue shipped with the editor.
    pub fn standard() -> Self {
        Self {
            main_modules: standard_main_modules(),
            sub_modules: standard_sub_modules(),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn main_module(&self, type_id: &str) -> Option<&MainModuleType> {
        self.main_modules.iter().find(|m| m.id == type_id)
    }

    pub fn sub_module(&self, type_id: &str) -> Option<&SubModuleType> {
        self.sub_modules.iter().find(|s| s.id == type_id)
    }

    /// Check catalogue data for consistency, returning every issue found.
    pub fn check(&self) -> Vec<CatalogIssue> {
        let mut issues = Vec::new();

        let mut seen = HashSet::new();
        let type_ids = self
            .main_modules
            .iter()
            .map(|m| &m.id)
            .chain(self.sub_modules.iter().map(|s| &s.id));
        for id in type_ids {
            if !seen.insert(id.as_str()) {
                issues.push(CatalogIssue::DuplicateTypeId(id.clone()));
            }
        }

        let sub_ids: HashSet<&str> = self.sub_modules.iter().map(|s| s.id.as_str()).collect();
        for m in &self.main_modules {
            if m.width <= 0.0 || m.depth <= 0.0 || m.height <= 0.0 || m.volume <= 0.0 {
                issues.push(CatalogIssue::NonPositiveSize(m.id.clone()));
            }
            let mut ports = HashSet::new();
            for p in &m.ports {
                if !ports.insert(p.id.as_str()) {
                    issues.push(CatalogIssue::DuplicatePortId {
                        module: m.id.clone(),
                        port: p.id.clone(),
                    });
                }
            }
            for allowed in &m.allowed_sub_modules {
                if !sub_ids.contains(allowed.as_str()) {
                    issues.push(CatalogIssue::UnknownAllowedSubModule {
                        module: m.id.clone(),
                        sub_module: allowed.clone(),
                    });
                }
            }
        }

        for s in &self.sub_modules {
            if s.width <= 0.0 || s.depth <= 0.0 || s.height <= 0.0 || s.volume <= 0.0 {
                issues.push(CatalogIssue::NonPositiveSize(s.id.clone()));
            }
            if s.allowed_anchors.is_empty() {
                issues.push(CatalogIssue::NoAnchors(s.id.clone()));
            }
        }

        issues
    }
}

// ── Built-in catalogue ──────────────────────────────────────────────────

fn port(id: &str, port_type: PortType, position: PortSide, x: f64, y: f64) -> Port {
    Port {
        id: id.to_string(),
        port_type,
        position,
        x,
        y,
    }
}

#[allow(clippy::too_many_arguments)]
fn main_type(
    id: &str,
    name: &str,
    category: MainCategory,
    (width, depth, height): (f64, f64, f64),
    volume: f64,
    mass: f64,
    ports: Vec<Port>,
    allowed: &[&str],
    max_connections: u32,
) -> MainModuleType {
    MainModuleType {
        id: id.to_string(),
        name: name.to_string(),
        category,
        width,
        depth,
        height,
        volume,
        mass: Some(mass),
        ports,
        allowed_sub_modules: allowed.iter().map(|s| s.to_string()).collect(),
        max_connections: Some(max_connections),
    }
}

#[allow(clippy::too_many_arguments)]
fn sub_type(
    id: &str,
    name: &str,
    category: SubCategory,
    (width, depth, height): (f64, f64, f64),
    volume: f64,
    mass: f64,
    anchors: &[Anchor],
    z_aware: bool,
) -> SubModuleType {
    SubModuleType {
        id: id.to_string(),
        name: name.to_string(),
        category,
        width,
        depth,
        height,
        volume,
        mass: Some(mass),
        allowed_anchors: anchors.to_vec(),
        z_aware,
    }
}

fn standard_main_modules() -> Vec<MainModuleType> {
    use MainCategory::*;
    use PortSide::*;
    use PortType::{Hab, Std, Svc};

    vec![
        main_type(
            "crew-quarters",
            "Crew Quarters",
            Habitation,
            (4.0, 3.0, 2.5),
            30.0,
            2400.0,
            vec![
                port("p-n", Hab, North, 2.0, 0.0),
                port("p-s", Hab, South, 2.0, 3.0),
                port("p-e", Std, East, 4.0, 1.5),
            ],
            &["bunk", "sleep-pod", "storage-rack", "workstation", "ceiling-light"],
            3,
        ),
        main_type(
            "hygiene",
            "Hygiene Unit",
            Hygiene,
            (2.0, 2.0, 2.5),
            10.0,
            900.0,
            vec![
                port("p-w", Svc, West, 0.0, 1.0),
                port("p-e", Std, East, 2.0, 1.0),
            ],
            &["toilet", "shower", "sink", "ceiling-light"],
            2,
        ),
        main_type(
            "galley",
            "Galley",
            Galley,
            (3.0, 3.0, 2.5),
            22.5,
            1800.0,
            vec![
                port("p-n", Svc, North, 1.5, 0.0),
                port("p-s", Hab, South, 1.5, 3.0),
                port("p-e", Std, East, 3.0, 1.5),
            ],
            &["stove", "galley-table", "food-storage", "sink", "ceiling-light"],
            3,
        ),
        main_type(
            "medical",
            "Medical Bay",
            Medical,
            (3.0, 3.0, 2.5),
            22.5,
            2000.0,
            vec![
                port("p-n", Hab, North, 1.5, 0.0),
                port("p-s", Std, South, 1.5, 3.0),
            ],
            &["med-bed", "med-cabinet", "sink", "storage-rack", "ceiling-light"],
            2,
        ),
        main_type(
            "airlock",
            "Airlock",
            Airlock,
            (2.0, 2.0, 2.5),
            10.0,
            1500.0,
            vec![
                port("p-out", PortType::Airlock, North, 1.0, 0.0),
                port("p-in", Std, South, 1.0, 2.0),
            ],
            &["eva-suit-rack", "ceiling-light"],
            2,
        ),
        main_type(
            "storage",
            "Storage Module",
            Storage,
            (3.0, 2.0, 2.5),
            15.0,
            1100.0,
            vec![
                port("p-n", Svc, North, 1.5, 0.0),
                port("p-s", Std, South, 1.5, 2.0),
            ],
            &["storage-rack", "food-storage"],
            2,
        ),
        main_type(
            "laboratory",
            "Laboratory",
            Laboratory,
            (4.0, 3.0, 2.5),
            30.0,
            2600.0,
            vec![
                port("p-w", Std, West, 0.0, 1.5),
                port("p-e", Hab, East, 4.0, 1.5),
            ],
            &["workstation", "storage-rack", "sink", "ceiling-light"],
            2,
        ),
        main_type(
            "exercise",
            "Exercise Module",
            Exercise,
            (3.0, 3.0, 2.5),
            22.5,
            1700.0,
            vec![
                port("p-n", Hab, North, 1.5, 0.0),
                port("p-s", Std, South, 1.5, 3.0),
            ],
            &["treadmill", "exercise-bike", "ceiling-light"],
            2,
        ),
        main_type(
            "node",
            "Connecting Node",
            Node,
            (2.0, 2.0, 2.5),
            10.0,
            800.0,
            vec![
                port("p-n", Std, North, 1.0, 0.0),
                port("p-s", Std, South, 1.0, 2.0),
                port("p-e", Std, East, 2.0, 1.0),
                port("p-w", Std, West, 0.0, 1.0),
            ],
            &[],
            4,
        ),
    ]
}

fn standard_sub_modules() -> Vec<SubModuleType> {
    use Anchor::*;
    use SubCategory::*;

    vec![
        sub_type("bunk", "Bunk", Sleep, (2.0, 0.9, 0.8), 1.44, 40.0, &[Floor, Wall], true),
        sub_type("sleep-pod", "Sleep Pod", Sleep, (1.0, 1.0, 2.2), 2.2, 60.0, &[Floor], true),
        sub_type("toilet", "Toilet", Hygiene, (0.8, 0.8, 0.9), 0.58, 35.0, &[Floor], false),
        sub_type("shower", "Shower", Hygiene, (1.0, 1.0, 2.2), 2.2, 50.0, &[Floor], true),
        sub_type("sink", "Sink", Hygiene, (0.6, 0.5, 0.3), 0.09, 8.0, &[Wall], true),
        sub_type("stove", "Stove", Food, (1.0, 0.7, 0.9), 0.63, 45.0, &[Floor], false),
        sub_type(
            "galley-table",
            "Galley Table",
            Food,
            (2.0, 1.0, 0.75),
            1.5,
            30.0,
            &[Floor],
            false,
        ),
        sub_type(
            "food-storage",
            "Food Storage",
            Storage,
            (1.0, 0.6, 1.8),
            1.08,
            40.0,
            &[Floor, Wall],
            true,
        ),
        sub_type("med-bed", "Medical Bed", Medical, (2.0, 1.0, 0.7), 1.4, 70.0, &[Floor], false),
        sub_type(
            "med-cabinet",
            "Medical Cabinet",
            Medical,
            (0.8, 0.4, 1.2),
            0.38,
            25.0,
            &[Wall],
            true,
        ),
        sub_type(
            "workstation",
            "Workstation",
            Workstation,
            (1.2, 0.8, 0.75),
            0.72,
            30.0,
            &[Floor],
            false,
        ),
        sub_type(
            "storage-rack",
            "Storage Rack",
            Storage,
            (1.0, 0.6, 2.0),
            1.2,
            35.0,
            &[Floor, Wall],
            true,
        ),
        sub_type("treadmill", "Treadmill", Exercise, (2.0, 0.8, 1.4), 2.24, 90.0, &[Floor], false),
        sub_type(
            "exercise-bike",
            "Exercise Bike",
            Exercise,
            (1.2, 0.6, 1.2),
            0.86,
            45.0,
            &[Floor],
            false,
        ),
        sub_type(
            "ceiling-light",
            "Ceiling Light",
            Lighting,
            (0.6, 0.6, 0.1),
            0.04,
            2.0,
            &[Ceiling],
            true,
        ),
        sub_type(
            "eva-suit-rack",
            "EVA Suit Rack",
            Eva,
            (1.0, 0.6, 2.0),
            1.2,
            120.0,
            &[Wall, Floor],
            true,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_compatibility_table() {
        use PortType::*;
        assert!(are_ports_compatible(Std, Airlock));
        assert!(!are_ports_compatible(Hab, Airlock));
        assert!(are_ports_compatible(Hab, Svc));
        assert!(are_ports_compatible(Svc, Hab));
        assert!(are_ports_compatible(Airlock, Airlock));
        assert!(!are_ports_compatible(Svc, Airlock));
    }

    #[test]
    fn port_compatibility_is_symmetric() {
        for a in PortType::ALL {
            for b in PortType::ALL {
                assert_eq!(are_ports_compatible(a, b), are_ports_compatible(b, a), "{a} / {b}");
            }
        }
    }

    #[test]
    fn port_type_parses_both_spellings() {
        assert_eq!("std-port".parse::<PortType>(), Ok(PortType::Std));
        assert_eq!("airlock".parse::<PortType>(), Ok(PortType::Airlock));
        assert!("docking".parse::<PortType>().is_err());
    }

    #[test]
    fn port_type_serde_accepts_alias() {
        let p: PortType = serde_json::from_str("\"hab\"").unwrap();
        assert_eq!(p, PortType::Hab);
        assert_eq!(serde_json::to_string(&PortType::Svc).unwrap(), "\"svc-port\"");
    }

    #[test]
    fn standard_catalog_is_consistent() {
        let catalog = Catalog::standard();
        let issues = catalog.check();
        assert!(issues.is_empty(), "standard catalog issues: {issues:?}");
        assert_eq!(catalog.main_modules.len(), 9);
        assert_eq!(catalog.sub_modules.len(), 16);
    }

    #[test]
    fn standard_catalog_has_essentials() {
        let catalog = Catalog::standard();
        for category in [MainCategory::Hygiene, MainCategory::Galley, MainCategory::Medical] {
            assert!(
                catalog.main_modules.iter().any(|m| m.category == category),
                "missing {category:?}"
            );
        }
    }

    #[test]
    fn check_reports_bad_entries() {
        let mut catalog = Catalog::standard();
        catalog.main_modules[0].allowed_sub_modules.push("jacuzzi".into());
        catalog.main_modules[1].width = 0.0;
        catalog.sub_modules[0].allowed_anchors.clear();
        let dup = catalog.main_modules[2].clone();
        catalog.main_modules.push(dup);

        let issues = catalog.check();
        assert!(issues.contains(&CatalogIssue::UnknownAllowedSubModule {
            module: "crew-quarters".into(),
            sub_module: "jacuzzi".into(),
        }));
        assert!(issues.contains(&CatalogIssue::NonPositiveSize("hygiene".into())));
        assert!(issues.contains(&CatalogIssue::NoAnchors("bunk".into())));
        assert!(issues.contains(&CatalogIssue::DuplicateTypeId("galley".into())));
    }

    #[test]
    fn catalog_json_roundtrip() {
        let catalog = Catalog::standard();
        let json = serde_json::to_string(&catalog).unwrap();
        let back = Catalog::from_json_str(&json).unwrap();
        assert_eq!(back, catalog);
    }

    #[test]
    fn malformed_catalog_json_is_an_error() {
        assert!(matches!(
            Catalog::from_json_str("{\"mainModules\": 3}"),
            Err(CatalogError::Json(_))
        ));
    }
}
