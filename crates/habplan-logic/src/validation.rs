//! Layout validation.
//!
//! Pure functions that take a [`LayoutState`] snapshot and return findings.
//! Each rule is independent; [`RULES`] lists them in display order and
//! [`validate_with`] folds them together. Problems are reported as
//! [`Finding`]s, never as `Err` or panics, so a half-consistent snapshot
//! (dangling parent ids, connections to deleted modules) is still
//! validated in full.

use crate::catalog::{are_ports_compatible, MainCategory};
use crate::config::ValidationConfig;
use crate::geometry::{footprint, Rect};
use crate::layout::{LayoutState, PlacedMainModule, PlacedSubModule};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};

/// Finding severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// One validation result. `module_id` is a hint for UI highlighting and may
/// name a main- or a sub-module instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    #[serde(rename = "type")]
    pub severity: Severity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_id: Option<String>,
}

impl Finding {
    pub fn error(message: String, module_id: Option<&str>) -> Self {
        Self {
            severity: Severity::Error,
            message,
            module_id: module_id.map(str::to_string),
        }
    }

    pub fn warning(message: String, module_id: Option<&str>) -> Self {
        Self {
            severity: Severity::Warning,
            message,
            module_id: module_id.map(str::to_string),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Whether any finding has error severity.
pub fn has_errors(findings: &[Finding]) -> bool {
    findings.iter().any(Finding::is_error)
}

/// Input shared by all rules: the snapshot, thresholds, and an id lookup
/// built once per validation run.
pub struct RuleContext<'a> {
    pub state: &'a LayoutState,
    pub config: &'a ValidationConfig,
    mains: HashMap<&'a str, &'a PlacedMainModule>,
}

impl<'a> RuleContext<'a> {
    pub fn new(state: &'a LayoutState, config: &'a ValidationConfig) -> Self {
        let mains = state
            .main_modules
            .iter()
            .map(|m| (m.instance_id.as_str(), m))
            .collect();
        Self {
            state,
            config,
            mains,
        }
    }

    pub fn main_module(&self, instance_id: &str) -> Option<&'a PlacedMainModule> {
        self.mains.get(instance_id).copied()
    }
}

/// A named validation rule.
pub struct Rule {
    pub name: &'static str,
    pub check: fn(&RuleContext<'_>) -> Vec<Finding>,
}

/// All rules, in the order their findings are reported.
pub const RULES: &[Rule] = &[
    Rule {
        name: "connectivity",
        check: check_connectivity,
    },
    Rule {
        name: "overlap",
        check: check_overlaps,
    },
    Rule {
        name: "parent_capacity",
        check: check_parent_capacity,
    },
    Rule {
        name: "crew_volume",
        check: check_crew_volume,
    },
    Rule {
        name: "essentials",
        check: check_essentials,
    },
    Rule {
        name: "z_clearance",
        check: check_z_clearance,
    },
    Rule {
        name: "port_connections",
        check: check_port_connections,
    },
    Rule {
        name: "sub_module_placement",
        check: check_sub_module_placement,
    },
    Rule {
        name: "port_reuse",
        check: check_port_reuse,
    },
];

fn main_label(m: &PlacedMainModule) -> String {
    if m.module_type.name.is_empty() {
        m.instance_id.clone()
    } else {
        format!("{} ({})", m.module_type.name, m.instance_id)
    }
}

fn sub_label(s: &PlacedSubModule) -> String {
    if s.module_type.name.is_empty() {
        s.instance_id.clone()
    } else {
        format!("{} ({})", s.module_type.name, s.instance_id)
    }
}

// ── A. Graph ────────────────────────────────────────────────────────────

/// All main modules must form one connected component.
///
/// BFS from the first module in insertion order; anything not reached is
/// floating. One finding summarizes the whole floating set.
pub fn check_connectivity(ctx: &RuleContext<'_>) -> Vec<Finding> {
    let mains = &ctx.state.main_modules;
    if mains.len() <= 1 {
        return Vec::new();
    }

    let floating: Vec<&str> = if ctx.state.connections.is_empty() {
        mains[1..].iter().map(|m| m.instance_id.as_str()).collect()
    } else {
        let mut adj: HashMap<&str, Vec<&str>> = HashMap::new();
        for c in &ctx.state.connections {
            adj.entry(c.from_module_id.as_str())
                .or_default()
                .push(c.to_module_id.as_str());
            adj.entry(c.to_module_id.as_str())
                .or_default()
                .push(c.from_module_id.as_str());
        }

        let start = mains[0].instance_id.as_str();
        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();
        visited.insert(start);
        queue.push_back(start);

        while let Some(current) = queue.pop_front() {
            if let Some(neighbors) = adj.get(current) {
                for &next in neighbors {
                    if visited.insert(next) {
                        queue.push_back(next);
                    }
                }
            }
        }

        mains
            .iter()
            .map(|m| m.instance_id.as_str())
            .filter(|id| !visited.contains(id))
            .collect()
    };

    if floating.is_empty() {
        return Vec::new();
    }
    vec![Finding::error(
        format!(
            "{} of {} modules are floating (not connected to the rest of the habitat)",
            floating.len(),
            mains.len()
        ),
        Some(floating[0]),
    )]
}

// ── B. Geometry ─────────────────────────────────────────────────────────

/// No two main-module footprints may overlap beyond the edge tolerance.
pub fn check_overlaps(ctx: &RuleContext<'_>) -> Vec<Finding> {
    let rects: Vec<(&str, Rect)> = ctx
        .state
        .main_modules
        .iter()
        .map(|m| (m.instance_id.as_str(), footprint(m)))
        .collect();

    let mut seen = HashSet::new();
    let mut involved = Vec::new();
    for i in 0..rects.len() {
        for j in (i + 1)..rects.len() {
            let (a_id, a) = rects[i];
            let (b_id, b) = rects[j];
            if a.overlaps(&b, ctx.config.overlap_tolerance) {
                for id in [a_id, b_id] {
                    if seen.insert(id) {
                        involved.push(id);
                    }
                }
            }
        }
    }

    if involved.is_empty() {
        return Vec::new();
    }
    vec![Finding::error(
        format!("{} modules are overlapping", involved.len()),
        Some(involved[0]),
    )]
}

// ── C. Capacity ─────────────────────────────────────────────────────────

/// Sub-module volume inside each main module: warn when nearly full,
/// error when over.
pub fn check_parent_capacity(ctx: &RuleContext<'_>) -> Vec<Finding> {
    let mut findings = Vec::new();
    for m in &ctx.state.main_modules {
        let capacity = m.module_type.volume;
        let used: f64 = ctx
            .state
            .children_of(&m.instance_id)
            .map(|s| s.module_type.volume)
            .sum();

        // Disjoint ranges: at most one of these fires per module.
        if used > capacity * ctx.config.capacity_warning_ratio && used <= capacity {
            findings.push(Finding::warning(
                format!(
                    "{} is at {:.0}% capacity",
                    main_label(m),
                    used / capacity * 100.0
                ),
                Some(&m.instance_id),
            ));
        }
        if used > capacity {
            findings.push(Finding::error(
                format!(
                    "{} is over capacity: {:.1}/{:.1} m³ of sub-modules",
                    main_label(m),
                    used,
                    capacity
                ),
                Some(&m.instance_id),
            ));
        }
    }
    findings
}

/// Total pressurized volume must cover the crew.
pub fn check_crew_volume(ctx: &RuleContext<'_>) -> Vec<Finding> {
    let crew = ctx.state.crew_size;
    let required = crew as f64 * ctx.config.min_volume_per_crew;
    let total = ctx.state.total_volume();
    if total < required {
        return vec![Finding::error(
            format!(
                "Insufficient habitable volume for a crew of {}: {:.1}/{:.1} m³",
                crew, total, required
            ),
            None,
        )];
    }
    Vec::new()
}

/// Hygiene quota scales with crew; at least one galley and one medical bay.
pub fn check_essentials(ctx: &RuleContext<'_>) -> Vec<Finding> {
    let mut findings = Vec::new();
    let mains = &ctx.state.main_modules;
    let crew = ctx.state.crew_size;

    let per_module = ctx.config.crew_per_hygiene_module.max(1);
    let min_hygiene = crew.div_ceil(per_module).max(1);
    let count_of = |category: MainCategory| {
        mains
            .iter()
            .filter(|m| m.module_type.category == category)
            .count()
    };

    let hygiene = count_of(MainCategory::Hygiene);
    if hygiene < min_hygiene as usize {
        findings.push(Finding::error(
            format!(
                "A crew of {} needs at least {} hygiene module(s), found {}",
                crew, min_hygiene, hygiene
            ),
            None,
        ));
    }
    if count_of(MainCategory::Galley) == 0 {
        findings.push(Finding::error(
            "No galley module: the crew has nowhere to prepare food".to_string(),
            None,
        ));
    }
    if count_of(MainCategory::Medical) == 0 {
        findings.push(Finding::error(
            "No medical module: at least one is required".to_string(),
            None,
        ));
    }
    findings
}

/// Height-aware sub-modules must fit under their parent's ceiling.
pub fn check_z_clearance(ctx: &RuleContext<'_>) -> Vec<Finding> {
    let mut findings = Vec::new();
    for m in &ctx.state.main_modules {
        let ceiling = m.module_type.height;
        for child in ctx
            .state
            .children_of(&m.instance_id)
            .filter(|s| s.module_type.z_aware)
        {
            let height = child.module_type.height;
            if height > ceiling {
                findings.push(Finding::error(
                    format!(
                        "{} is taller than {}: {:.2} m > {:.2} m",
                        sub_label(child),
                        main_label(m),
                        height,
                        ceiling
                    ),
                    Some(&child.instance_id),
                ));
            }
            let top = child.z + height;
            if top > ceiling {
                findings.push(Finding::error(
                    format!(
                        "{} extends through the ceiling of {}: top at {:.2} m, ceiling at {:.2} m",
                        sub_label(child),
                        main_label(m),
                        top,
                        ceiling
                    ),
                    Some(&child.instance_id),
                ));
            }
        }
    }
    findings
}

// ── D. References ───────────────────────────────────────────────────────

/// Every connection must join two existing ports of compatible types.
pub fn check_port_connections(ctx: &RuleContext<'_>) -> Vec<Finding> {
    let mut findings = Vec::new();
    for c in &ctx.state.connections {
        let (Some(from), Some(to)) = (
            ctx.main_module(&c.from_module_id),
            ctx.main_module(&c.to_module_id),
        ) else {
            findings.push(Finding::error(
                format!("Connection {} references a non-existent module", c.id),
                None,
            ));
            continue;
        };

        let (Some(from_port), Some(to_port)) = (
            from.module_type.port(&c.from_port_id),
            to.module_type.port(&c.to_port_id),
        ) else {
            findings.push(Finding::error(
                format!("Connection {} references a non-existent port", c.id),
                Some(&from.instance_id),
            ));
            continue;
        };

        if !are_ports_compatible(from_port.port_type, to_port.port_type) {
            findings.push(Finding::error(
                format!(
                    "Incompatible ports on connection {}: {} cannot mate with {}",
                    c.id, from_port.port_type, to_port.port_type
                ),
                Some(&from.instance_id),
            ));
        }
    }
    findings
}

/// Every sub-module needs an existing parent whose type allows it.
pub fn check_sub_module_placement(ctx: &RuleContext<'_>) -> Vec<Finding> {
    let mut findings = Vec::new();
    for s in &ctx.state.sub_modules {
        match ctx.main_module(&s.parent_instance_id) {
            None => findings.push(Finding::error(
                format!("{} has no parent module", sub_label(s)),
                Some(&s.instance_id),
            )),
            Some(parent) if !parent.module_type.allows_sub_module(s.type_id()) => {
                findings.push(Finding::error(
                    format!(
                        "Sub-module type '{}' is not allowed in module type '{}'",
                        s.type_id(),
                        parent.type_id()
                    ),
                    Some(&s.instance_id),
                ))
            }
            Some(_) => {}
        }
    }
    findings
}

/// A port may take part in at most one connection.
pub fn check_port_reuse(ctx: &RuleContext<'_>) -> Vec<Finding> {
    let mut counts: HashMap<(&str, &str), usize> = HashMap::new();
    let mut order = Vec::new();
    for c in &ctx.state.connections {
        for key in [
            (c.from_module_id.as_str(), c.from_port_id.as_str()),
            (c.to_module_id.as_str(), c.to_port_id.as_str()),
        ] {
            let count = counts.entry(key).or_insert(0);
            if *count == 0 {
                order.push(key);
            }
            *count += 1;
        }
    }

    order
        .into_iter()
        .filter_map(|key| {
            let count = counts[&key];
            (count > 1).then(|| {
                let (module_id, port_id) = key;
                Finding::error(
                    format!(
                        "Port {} on module {} is used by {} connections (max 1)",
                        port_id, module_id, count
                    ),
                    Some(module_id),
                )
            })
        })
        .collect()
}

// ── Master validation ───────────────────────────────────────────────────

/// Validate with the default thresholds.
pub fn validate(state: &LayoutState) -> Vec<Finding> {
    validate_with(state, &ValidationConfig::default())
}

/// Run every rule and return the combined findings.
///
/// An empty layout short-circuits to a single warning instead of an
/// all-clear.
pub fn validate_with(state: &LayoutState, config: &ValidationConfig) -> Vec<Finding> {
    if state.is_empty() {
        return vec![Finding::warning(
            "No modules placed yet: add a main module to start the layout".to_string(),
            None,
        )];
    }

    let ctx = RuleContext::new(state, config);
    let findings: Vec<Finding> = RULES.iter().flat_map(|rule| (rule.check)(&ctx)).collect();

    let errors = findings.iter().filter(|f| f.is_error()).count();
    log::debug!(
        "Validated {} modules: {} errors, {} warnings",
        state.main_modules.len(),
        errors,
        findings.len() - errors
    );
    findings
}

/// Result of the 2D → 3D mode gate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModeGate {
    pub allowed: bool,
    pub errors: Vec<Finding>,
}

/// The 3D view opens only for a non-empty layout with no error findings.
pub fn can_switch_to_3d(state: &LayoutState) -> ModeGate {
    let findings = validate(state);
    ModeGate {
        allowed: !has_errors(&findings) && !state.is_empty(),
        errors: findings.into_iter().filter(Finding::is_error).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{
        Anchor, MainModuleType, Port, PortSide, PortType, SubCategory, SubModuleType,
    };
    use crate::geometry::Rotation;
    use crate::layout::Connection;

    fn make_main(
        id: &str,
        category: MainCategory,
        x: f64,
        y: f64,
        w: f64,
        d: f64,
    ) -> PlacedMainModule {
        PlacedMainModule {
            instance_id: id.to_string(),
            x,
            y,
            rotation: Rotation::R0,
            module_type: MainModuleType {
                id: format!("{category:?}").to_lowercase(),
                name: String::new(),
                category,
                width: w,
                depth: d,
                height: 2.5,
                volume: w * d * 2.5,
                mass: None,
                ports: vec![
                    Port {
                        id: "a".into(),
                        port_type: PortType::Std,
                        position: PortSide::North,
                        x: w / 2.0,
                        y: 0.0,
                    },
                    Port {
                        id: "b".into(),
                        port_type: PortType::Std,
                        position: PortSide::South,
                        x: w / 2.0,
                        y: d,
                    },
                ],
                allowed_sub_modules: vec!["crate".into()],
                max_connections: None,
            },
        }
    }

    fn make_sub(id: &str, parent: &str, volume: f64, height: f64, z: f64) -> PlacedSubModule {
        PlacedSubModule {
            instance_id: id.to_string(),
            parent_instance_id: parent.to_string(),
            x: 0.0,
            y: 0.0,
            z,
            anchor: Some(Anchor::Floor),
            module_type: SubModuleType {
                id: "crate".into(),
                name: String::new(),
                category: SubCategory::Storage,
                width: 0.5,
                depth: 0.5,
                height,
                volume,
                mass: None,
                allowed_anchors: vec![Anchor::Floor],
                z_aware: true,
            },
        }
    }

    fn make_conn(id: &str, a: &str, pa: &str, b: &str, pb: &str) -> Connection {
        Connection {
            id: id.into(),
            from_module_id: a.into(),
            from_port_id: pa.into(),
            to_module_id: b.into(),
            to_port_id: pb.into(),
        }
    }

    fn run(state: &LayoutState, rule: fn(&RuleContext<'_>) -> Vec<Finding>) -> Vec<Finding> {
        let config = ValidationConfig::default();
        rule(&RuleContext::new(state, &config))
    }

    #[test]
    fn test_empty_layout_single_warning() {
        let findings = validate(&LayoutState::new(4));
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Warning);
    }

    #[test]
    fn test_empty_layout_ignores_stray_sub_modules() {
        let mut state = LayoutState::new(2);
        state.sub_modules.push(make_sub("s1", "gone", 0.5, 0.5, 0.0));
        let findings = validate(&state);
        assert_eq!(findings.len(), 1);
        assert!(!has_errors(&findings));

        let gate = can_switch_to_3d(&state);
        assert!(!gate.allowed);
        assert!(gate.errors.is_empty());
    }

    #[test]
    fn test_has_errors() {
        assert!(!has_errors(&[]));
        assert!(!has_errors(&[Finding::warning("w".into(), None)]));
        assert!(has_errors(&[
            Finding::warning("w".into(), None),
            Finding::error("e".into(), Some("m1")),
        ]));
    }

    #[test]
    fn test_single_module_not_floating() {
        let mut state = LayoutState::new(1);
        state.main_modules.push(make_main("m1", MainCategory::Node, 0.0, 0.0, 2.0, 2.0));
        assert!(run(&state, check_connectivity).is_empty());
    }

    #[test]
    fn test_no_connections_all_but_root_floating() {
        let mut state = LayoutState::new(1);
        for i in 0..3 {
            let x = i as f64 * 3.0;
            state
                .main_modules
                .push(make_main(&format!("m{i}"), MainCategory::Node, x, 0.0, 2.0, 2.0));
        }
        let errs = run(&state, check_connectivity);
        assert_eq!(errs.len(), 1);
        assert!(errs[0].message.starts_with("2 of 3"));
        assert_eq!(errs[0].module_id.as_deref(), Some("m1"));
    }

    #[test]
    fn test_connectivity_through_chain() {
        let mut state = LayoutState::new(1);
        for i in 0..3 {
            let x = i as f64 * 3.0;
            state
                .main_modules
                .push(make_main(&format!("m{i}"), MainCategory::Node, x, 0.0, 2.0, 2.0));
        }
        state.connections.push(make_conn("c1", "m1", "a", "m0", "b"));
        state.connections.push(make_conn("c2", "m2", "a", "m1", "b"));
        assert!(run(&state, check_connectivity).is_empty());
    }

    #[test]
    fn test_overlap_counts_distinct_modules() {
        let mut state = LayoutState::new(1);
        state.main_modules.push(make_main("a", MainCategory::Node, 0.0, 0.0, 2.0, 2.0));
        state.main_modules.push(make_main("b", MainCategory::Node, 1.0, 0.0, 2.0, 2.0));
        state.main_modules.push(make_main("c", MainCategory::Node, 1.5, 1.0, 2.0, 2.0));
        state.main_modules.push(make_main("d", MainCategory::Node, 10.0, 10.0, 2.0, 2.0));
        let errs = run(&state, check_overlaps);
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].message, "3 modules are overlapping");
        assert_eq!(errs[0].module_id.as_deref(), Some("a"));
    }

    #[test]
    fn test_capacity_warning_and_error_are_exclusive() {
        let mut state = LayoutState::new(1);
        // 2 × 2 × 2.5 = 10 m³
        state.main_modules.push(make_main("p", MainCategory::Storage, 0.0, 0.0, 2.0, 2.0));
        state.sub_modules.push(make_sub("s1", "p", 5.0, 1.0, 0.0));
        state.sub_modules.push(make_sub("s2", "p", 4.5, 1.0, 0.0));
        let findings = run(&state, check_parent_capacity);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Warning);
        assert!(findings[0].message.contains("95% capacity"));

        state.sub_modules.push(make_sub("s3", "p", 0.6, 1.0, 0.0));
        let findings = run(&state, check_parent_capacity);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Error);
        assert!(findings[0].message.contains("10.1/10.0"));
    }

    #[test]
    fn test_capacity_ignores_other_parents() {
        let mut state = LayoutState::new(1);
        state.main_modules.push(make_main("p", MainCategory::Storage, 0.0, 0.0, 2.0, 2.0));
        state.sub_modules.push(make_sub("s1", "elsewhere", 50.0, 1.0, 0.0));
        assert!(run(&state, check_parent_capacity).is_empty());
    }

    #[test]
    fn test_hygiene_quota_scales_with_crew() {
        let mut state = LayoutState::new(7);
        state.main_modules.push(make_main("h1", MainCategory::Hygiene, 0.0, 0.0, 2.0, 2.0));
        state.main_modules.push(make_main("h2", MainCategory::Hygiene, 3.0, 0.0, 2.0, 2.0));
        state.main_modules.push(make_main("g", MainCategory::Galley, 6.0, 0.0, 2.0, 2.0));
        state.main_modules.push(make_main("md", MainCategory::Medical, 9.0, 0.0, 2.0, 2.0));
        let errs = run(&state, check_essentials);
        assert_eq!(errs.len(), 1);
        assert!(errs[0].message.contains("at least 3 hygiene"));

        state.crew_size = 6;
        assert!(run(&state, check_essentials).is_empty());
    }

    #[test]
    fn test_missing_galley_and_medical_reported_separately() {
        let mut state = LayoutState::new(1);
        state.main_modules.push(make_main("h", MainCategory::Hygiene, 0.0, 0.0, 2.0, 2.0));
        let errs = run(&state, check_essentials);
        assert_eq!(errs.len(), 2);
        assert!(errs[0].message.contains("galley"));
        assert!(errs[1].message.contains("medical"));
    }

    #[test]
    fn test_zero_crew_still_needs_one_hygiene() {
        let mut state = LayoutState::new(0);
        state.main_modules.push(make_main("g", MainCategory::Galley, 0.0, 0.0, 2.0, 2.0));
        state.main_modules.push(make_main("md", MainCategory::Medical, 3.0, 0.0, 2.0, 2.0));
        let errs = run(&state, check_essentials);
        assert_eq!(errs.len(), 1);
        assert!(errs[0].message.contains("at least 1 hygiene"));
    }

    #[test]
    fn test_z_clearance_checks_run_independently() {
        let mut state = LayoutState::new(1);
        state.main_modules.push(make_main("p", MainCategory::Storage, 0.0, 0.0, 2.0, 2.0));
        state.sub_modules.push(make_sub("fits", "p", 0.1, 2.0, 0.5));
        state.sub_modules.push(make_sub("raised", "p", 0.1, 2.0, 0.6));
        state.sub_modules.push(make_sub("giant", "p", 0.1, 3.0, 0.0));
        let errs = run(&state, check_z_clearance);
        assert_eq!(errs.len(), 3, "{errs:?}");
        assert_eq!(errs[0].module_id.as_deref(), Some("raised"));
        assert_eq!(errs[1].module_id.as_deref(), Some("giant"));
        assert_eq!(errs[2].module_id.as_deref(), Some("giant"));
    }

    #[test]
    fn test_z_clearance_skips_flat_sub_modules() {
        let mut state = LayoutState::new(1);
        state.main_modules.push(make_main("p", MainCategory::Storage, 0.0, 0.0, 2.0, 2.0));
        let mut sub = make_sub("flat", "p", 0.1, 3.0, 1.0);
        sub.module_type.z_aware = false;
        state.sub_modules.push(sub);
        assert!(run(&state, check_z_clearance).is_empty());
    }

    #[test]
    fn test_dangling_connection_endpoints() {
        let mut state = LayoutState::new(1);
        state.main_modules.push(make_main("m0", MainCategory::Node, 0.0, 0.0, 2.0, 2.0));
        state.main_modules.push(make_main("m1", MainCategory::Node, 3.0, 0.0, 2.0, 2.0));
        state.connections.push(make_conn("c1", "m0", "a", "ghost", "a"));
        state.connections.push(make_conn("c2", "m0", "zz", "m1", "a"));
        let errs = run(&state, check_port_connections);
        assert_eq!(errs.len(), 2);
        assert!(errs[0].message.contains("non-existent module"));
        assert!(errs[1].message.contains("non-existent port"));
        assert_eq!(errs[1].module_id.as_deref(), Some("m0"));
    }

    #[test]
    fn test_incompatible_ports_named() {
        let mut state = LayoutState::new(1);
        let mut a = make_main("m0", MainCategory::Node, 0.0, 0.0, 2.0, 2.0);
        a.module_type.ports[0].port_type = PortType::Hab;
        let mut b = make_main("m1", MainCategory::Node, 3.0, 0.0, 2.0, 2.0);
        b.module_type.ports[1].port_type = PortType::Airlock;
        state.main_modules.extend([a, b]);
        state.connections.push(make_conn("c1", "m0", "a", "m1", "b"));
        let errs = run(&state, check_port_connections);
        assert_eq!(errs.len(), 1);
        assert!(errs[0].message.contains("hab-port"));
        assert!(errs[0].message.contains("airlock-port"));
        assert_eq!(errs[0].module_id.as_deref(), Some("m0"));
    }

    #[test]
    fn test_sub_module_parent_checks() {
        let mut state = LayoutState::new(1);
        state.main_modules.push(make_main("p", MainCategory::Storage, 0.0, 0.0, 2.0, 2.0));
        state.sub_modules.push(make_sub("orphan", "gone", 0.1, 1.0, 0.0));
        let mut wrong = make_sub("wrong", "p", 0.1, 1.0, 0.0);
        wrong.module_type.id = "piano".into();
        state.sub_modules.push(wrong);
        state.sub_modules.push(make_sub("ok", "p", 0.1, 1.0, 0.0));
        let errs = run(&state, check_sub_module_placement);
        assert_eq!(errs.len(), 2);
        assert!(errs[0].message.contains("no parent"));
        assert!(errs[1].message.contains("'piano'"));
        assert!(errs[1].message.contains("'storage'"));
    }

    #[test]
    fn test_port_reuse_counts_both_endpoints() {
        let mut state = LayoutState::new(1);
        for i in 0..3 {
            let x = i as f64 * 3.0;
            state
                .main_modules
                .push(make_main(&format!("m{i}"), MainCategory::Node, x, 0.0, 2.0, 2.0));
        }
        state.connections.push(make_conn("c1", "m0", "a", "m1", "a"));
        state.connections.push(make_conn("c2", "m2", "a", "m0", "a"));
        let errs = run(&state, check_port_reuse);
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].message, "Port a on module m0 is used by 2 connections (max 1)");
    }

    #[test]
    fn test_rules_are_listed_once() {
        let names: HashSet<&str> = RULES.iter().map(|r| r.name).collect();
        assert_eq!(names.len(), RULES.len());
        assert_eq!(RULES.len(), 9);
    }

    #[test]
    fn test_mode_gate_blocks_on_errors() {
        let gate = can_switch_to_3d(&LayoutState::new(1));
        assert!(!gate.allowed);
        assert!(gate.errors.is_empty());

        let mut state = LayoutState::new(1);
        state.main_modules.push(make_main("h", MainCategory::Hygiene, 0.0, 0.0, 2.0, 2.0));
        let gate = can_switch_to_3d(&state);
        assert!(!gate.allowed);
        assert!(gate.errors.iter().all(Finding::is_error));
        assert!(!gate.errors.is_empty());
    }

    #[test]
    fn test_finding_json_shape() {
        let f = Finding::error("boom".into(), Some("m1"));
        let v = serde_json::to_value(&f).unwrap();
        assert_eq!(v["type"], "error");
        assert_eq!(v["moduleId"], "m1");
        let w = Finding::warning("hm".into(), None);
        let v = serde_json::to_value(&w).unwrap();
        assert!(v.get("moduleId").is_none());
    }
}
