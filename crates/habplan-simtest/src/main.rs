//! HabPlan Headless Validation Harness
//!
//! Exercises the layout logic without any UI: catalogue consistency, rule
//! scenarios, editor cascades and a seeded sweep of random layouts.
//! Runs entirely in-process.
//!
//! Usage:
//!   cargo run -p habplan-simtest
//!   cargo run -p habplan-simtest -- --verbose --seed 7
//!   RUST_LOG=debug cargo run -p habplan-simtest -- --seed=7
//!   cargo run -p habplan-simtest -- --layout habitat.json --config habplan.json

use habplan_logic::catalog::{are_ports_compatible, Anchor, Catalog, MainModuleType, PortType};
use habplan_logic::config::{load_config, validate_config, EditorConfig, HabitatConfig};
use habplan_logic::editor::{
    connect_ports, delete_main_module, move_sub_module, place_main_module, place_sub_module,
    rotate_main_module, EditError, EditorSession, SubMoveOutcome, SubPlacement,
};
use habplan_logic::geometry::{footprint, port_world_position, Rotation};
use habplan_logic::layout::{summarize, Connection, LayoutState, PlacedMainModule, PlacedSubModule};
use habplan_logic::persistence::{from_json_str, load_from_path, to_json_string};
use habplan_logic::validation::{
    can_switch_to_3d, has_errors, validate, validate_with, Finding, Severity,
};
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const DEFAULT_SEED: u64 = 42;
const SWEEP_LAYOUTS: usize = 200;

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

impl TestResult {
    fn failed_edit(name: &str, err: EditError) -> Self {
        TestResult {
            name: name.into(),
            passed: false,
            detail: format!("edit rejected: {}", err),
        }
    }
}

/// Headless validation harness for HabPlan layouts.
#[derive(Parser, Debug)]
#[command(name = "habplan-simtest")]
#[command(about = "Sweep HabPlan layouts through the validator without any UI")]
struct Args {
    /// Print every result and log editor and validator activity
    #[arg(long, short = 'v')]
    verbose: bool,

    /// Seed for the random layout sweep
    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,

    /// Saved layout to load and validate
    #[arg(long)]
    layout: Option<PathBuf>,

    /// Habitat config file (JSON)
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Log filter for the run: `--verbose` forces debug, otherwise `RUST_LOG`
/// decides and falls back to errors only.
fn log_filter(verbose: bool, from_env: Option<&str>) -> String {
    match (verbose, from_env) {
        (true, _) => "debug".to_string(),
        (false, Some(directives)) if !directives.trim().is_empty() => directives.to_string(),
        _ => "error".to_string(),
    }
}

fn init_logging(verbose: bool) {
    let from_env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let env_filter = EnvFilter::try_new(log_filter(verbose, from_env.as_deref()))
        .unwrap_or_else(|_| EnvFilter::new("error"));
    // try_init also bridges the `log` records the logic crate emits.
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(env_filter)
        .with_target(false)
        .try_init();
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);
    let verbose = args.verbose;
    println!("=== HabPlan Validation Harness ===\n");

    let config = match &args.config {
        Some(path) => match load_config(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("error: {}: {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => HabitatConfig::default(),
    };

    let mut results = Vec::new();

    // 1. Config and catalogue
    results.extend(validate_catalogue(&config, verbose));

    // 2. Validator rules on hand-built layouts
    results.extend(validate_rule_scenarios(verbose));

    // 3. Editor operations and cascades
    results.extend(validate_editor_scenarios(&config, verbose));

    // 4. Seeded random layouts
    results.extend(sweep_random_layouts(&config, args.seed, verbose));

    // 5. Saved layout, if given
    if let Some(path) = &args.layout {
        results.extend(check_layout_file(path, &config, verbose));
    }

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );

    if failed > 0 {
        std::process::exit(1);
    }
}

// ── 1. Config & Catalogue ───────────────────────────────────────────────

fn validate_catalogue(config: &HabitatConfig, verbose: bool) -> Vec<TestResult> {
    println!("--- Config & Catalogue ---");
    let mut results = Vec::new();

    let config_errors = validate_config(config);
    results.push(TestResult {
        name: "config_valid".into(),
        passed: config_errors.is_empty(),
        detail: if config_errors.is_empty() {
            format!(
                "{:.1} m³/crew, warn at {:.0}%, grid {:.2} m",
                config.validation.min_volume_per_crew,
                config.validation.capacity_warning_ratio * 100.0,
                config.editor.grid_size
            )
        } else {
            config_errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; ")
        },
    });

    let catalog = Catalog::standard();
    results.push(TestResult {
        name: "catalog_sizes".into(),
        passed: catalog.main_modules.len() == 9 && catalog.sub_modules.len() == 16,
        detail: format!(
            "{} main types, {} sub types",
            catalog.main_modules.len(),
            catalog.sub_modules.len()
        ),
    });

    let issues = catalog.check();
    results.push(TestResult {
        name: "catalog_consistent".into(),
        passed: issues.is_empty(),
        detail: if issues.is_empty() {
            "no duplicate ids, dangling sub-module refs or empty anchor sets".into()
        } else {
            issues
                .iter()
                .map(|i| i.to_string())
                .collect::<Vec<_>>()
                .join("; ")
        },
    });

    // Every main type needs a port to join the habitat graph.
    let portless: Vec<&str> = catalog
        .main_modules
        .iter()
        .filter(|m| m.ports.is_empty())
        .map(|m| m.id.as_str())
        .collect();
    results.push(TestResult {
        name: "catalog_ports_present".into(),
        passed: portless.is_empty(),
        detail: if portless.is_empty() {
            "every main type has at least one port".into()
        } else {
            format!("no ports: {}", portless.join(", "))
        },
    });

    // Ports sit on the outline in every orientation.
    let mut off_outline = Vec::new();
    for module_type in &catalog.main_modules {
        for rotation in [Rotation::R0, Rotation::R90, Rotation::R180, Rotation::R270] {
            let mut module = placed(&module_type.id, module_type, 0.0, 0.0);
            module.rotation = rotation;
            let rect = footprint(&module);
            for port in &module_type.ports {
                let (px, py) = port_world_position(&module, port);
                let on_edge = (px - rect.x).abs() < 1e-9
                    || (px - rect.right()).abs() < 1e-9
                    || (py - rect.y).abs() < 1e-9
                    || (py - rect.bottom()).abs() < 1e-9;
                if !rect.contains_point(px, py) || !on_edge {
                    off_outline.push(format!(
                        "{}:{}@{}",
                        module_type.id,
                        port.id,
                        rotation.degrees()
                    ));
                }
            }
        }
    }
    results.push(TestResult {
        name: "catalog_ports_on_outline".into(),
        passed: off_outline.is_empty(),
        detail: if off_outline.is_empty() {
            "all ports on the module edge at 0/90/180/270°".into()
        } else {
            off_outline.join(", ")
        },
    });

    // Ceiling mounts must fit under every parent that allows them.
    let mut too_tall = Vec::new();
    for m in &catalog.main_modules {
        for sub_id in &m.allowed_sub_modules {
            if let Some(s) = catalog.sub_module(sub_id) {
                if s.z_aware && s.height > m.height {
                    too_tall.push(format!("{} in {}", s.id, m.id));
                }
            }
        }
    }
    results.push(TestResult {
        name: "catalog_sub_heights".into(),
        passed: too_tall.is_empty(),
        detail: if too_tall.is_empty() {
            "every allowed sub-module fits its parent's ceiling".into()
        } else {
            too_tall.join(", ")
        },
    });

    if verbose {
        println!("  Main module types:");
        for m in &catalog.main_modules {
            let ports: Vec<String> = m
                .ports
                .iter()
                .map(|p| format!("{}={}", p.id, p.port_type))
                .collect();
            println!(
                "    {:14} {:.1}×{:.1}×{:.1} m  {:5.1} m³  [{}]",
                m.id,
                m.width,
                m.depth,
                m.height,
                m.volume,
                ports.join(" ")
            );
        }
    }

    results
}

// ── 2. Rule Scenarios ───────────────────────────────────────────────────

fn placed(instance_id: &str, module_type: &MainModuleType, x: f64, y: f64) -> PlacedMainModule {
    PlacedMainModule {
        instance_id: instance_id.to_string(),
        x,
        y,
        rotation: Rotation::R0,
        module_type: module_type.clone(),
    }
}

/// Copy of `base` with a new footprint and volume.
fn reshaped(base: &MainModuleType, width: f64, depth: f64, volume: f64) -> MainModuleType {
    let mut module_type = base.clone();
    module_type.width = width;
    module_type.depth = depth;
    module_type.volume = volume;
    module_type
}

fn link(id: &str, from: &str, from_port: &str, to: &str, to_port: &str) -> Connection {
    Connection {
        id: id.into(),
        from_module_id: from.into(),
        from_port_id: from_port.into(),
        to_module_id: to.into(),
        to_port_id: to_port.into(),
    }
}

fn matching<'a>(findings: &'a [Finding], needle: &str) -> Vec<&'a Finding> {
    findings.iter().filter(|f| f.message.contains(needle)).collect()
}

fn validate_rule_scenarios(verbose: bool) -> Vec<TestResult> {
    println!("--- Rule Scenarios ---");
    let mut results = Vec::new();

    let catalog = Catalog::standard();
    let (Some(node), Some(rack)) = (catalog.main_module("node"), catalog.sub_module("storage-rack"))
    else {
        results.push(TestResult {
            name: "rules_catalog".into(),
            passed: false,
            detail: "standard catalogue lacks node or storage-rack".into(),
        });
        return results;
    };
    let unit = reshaped(node, 1.0, 1.0, 2.5);

    // Empty layout
    let findings = validate(&LayoutState::new(4));
    results.push(TestResult {
        name: "rule_empty_layout".into(),
        passed: findings.len() == 1 && findings[0].severity == Severity::Warning,
        detail: format!("{} finding(s) for an empty layout", findings.len()),
    });

    // One module is never floating
    let mut state = LayoutState::new(1);
    state.main_modules.push(placed("A", node, 0.0, 0.0));
    let floating = matching(&validate(&state), "floating").len();
    results.push(TestResult {
        name: "rule_single_module_connected".into(),
        passed: floating == 0,
        detail: format!("{} connectivity finding(s) for n=1", floating),
    });

    // A–B connected, C floating
    state.main_modules.push(placed("B", node, 2.0, 0.0));
    state.main_modules.push(placed("C", node, 10.0, 0.0));
    state.connections.push(link("c1", "A", "p-e", "B", "p-w"));
    let findings = validate(&state);
    let floating = matching(&findings, "floating");
    results.push(TestResult {
        name: "rule_floating_module".into(),
        passed: floating.len() == 1
            && floating[0].message.starts_with("1 of 3")
            && floating[0].module_id.as_deref() == Some("C"),
        detail: floating
            .first()
            .map(|f| f.message.clone())
            .unwrap_or_else(|| "no connectivity finding".into()),
    });

    // Overlap vs edge contact
    let mut state = LayoutState::new(1);
    state.main_modules.push(placed("P", &unit, 0.0, 0.0));
    state.main_modules.push(placed("Q", &unit, 0.5, 0.5));
    let overlapping = matching(&validate(&state), "overlapping").len();
    state.main_modules[1].x = 1.0;
    state.main_modules[1].y = 0.0;
    let touching = matching(&validate(&state), "overlapping").len();
    results.push(TestResult {
        name: "rule_overlap_tolerance".into(),
        passed: overlapping == 1 && touching == 0,
        detail: format!("overlap={} edge-contact={}", overlapping, touching),
    });

    // 2×1 at 90° occupies 1×2
    let long = reshaped(node, 2.0, 1.0, 5.0);
    let mut turned = placed("R", &long, 0.0, 0.0);
    turned.rotation = Rotation::R90;
    let mut state = LayoutState::new(1);
    state.main_modules = vec![turned.clone(), placed("E", &unit, 1.0, 0.0)];
    let beside = matching(&validate(&state), "overlapping").len();
    state.main_modules = vec![turned, placed("S", &unit, 0.0, 1.5)];
    let below = matching(&validate(&state), "overlapping").len();
    results.push(TestResult {
        name: "rule_rotation_footprint".into(),
        passed: beside == 0 && below == 1,
        detail: format!("east neighbour={} south neighbour={}", beside, below),
    });

    // Crew volume boundary
    let crew_volume = |second: f64| {
        let mut state = LayoutState::new(4);
        state.main_modules.push(placed("V1", &reshaped(node, 2.0, 2.0, 30.0), 0.0, 0.0));
        state.main_modules.push(placed("V2", &reshaped(node, 2.0, 2.0, second), 2.0, 0.0));
        state.connections.push(link("c1", "V1", "p-e", "V2", "p-w"));
        matching(&validate(&state), "habitable volume")
            .into_iter()
            .map(|f| f.message.clone())
            .collect::<Vec<_>>()
    };
    let short = crew_volume(9.9);
    let exact = crew_volume(10.0);
    results.push(TestResult {
        name: "rule_crew_volume_boundary".into(),
        passed: short.len() == 1 && short[0].contains("39.9/40.0") && exact.is_empty(),
        detail: format!("39.9 m³ → {} error(s), 40.0 m³ → {}", short.len(), exact.len()),
    });

    // Port compatibility table
    let parse = |s: &str| s.parse::<PortType>().ok();
    let ports = (
        parse("std-port"),
        parse("airlock-port"),
        parse("hab-port"),
        parse("svc-port"),
    );
    let table_ok = match ports {
        (Some(standard), Some(airlock), Some(hab), Some(svc)) => {
            are_ports_compatible(standard, airlock)
                && !are_ports_compatible(hab, airlock)
                && are_ports_compatible(hab, svc)
                && PortType::ALL.iter().all(|&a| {
                    PortType::ALL
                        .iter()
                        .all(|&b| are_ports_compatible(a, b) == are_ports_compatible(b, a))
                })
        }
        _ => false,
    };
    results.push(TestResult {
        name: "rule_port_compatibility".into(),
        passed: table_ok,
        detail: "std↔airlock ok, hab↔airlock refused, hab↔svc ok, symmetric".into(),
    });

    // Port reuse
    let mut state = LayoutState::new(1);
    for (i, id) in ["A", "B", "C"].iter().enumerate() {
        state.main_modules.push(placed(id, node, i as f64 * 2.0, 0.0));
    }
    state.connections.push(link("c1", "A", "p-e", "B", "p-w"));
    state.connections.push(link("c2", "C", "p-w", "B", "p-w"));
    let findings = validate(&state);
    let reuse = matching(&findings, "used by");
    results.push(TestResult {
        name: "rule_port_reuse".into(),
        passed: reuse.len() == 1 && reuse[0].message.contains("used by 2 connections"),
        detail: reuse
            .first()
            .map(|f| f.message.clone())
            .unwrap_or_else(|| "no port reuse finding".into()),
    });

    // Capacity boundary
    let capacity = |volumes: &[f64]| {
        let mut state = LayoutState::new(1);
        state.main_modules.push(placed("H", node, 0.0, 0.0));
        for (i, volume) in volumes.iter().enumerate() {
            let mut module_type = rack.clone();
            module_type.volume = *volume;
            state.sub_modules.push(PlacedSubModule {
                instance_id: format!("s{}", i + 1),
                parent_instance_id: "H".into(),
                x: 0.0,
                y: 0.0,
                z: 0.0,
                anchor: None,
                module_type,
            });
        }
        matching(&validate(&state), "capacity")
            .into_iter()
            .map(|f| (f.severity, f.message.clone()))
            .collect::<Vec<_>>()
    };
    let near = capacity(&[5.0, 4.5]);
    let over = capacity(&[5.0, 5.1]);
    results.push(TestResult {
        name: "rule_capacity_boundary".into(),
        passed: near.len() == 1
            && near[0].0 == Severity::Warning
            && near[0].1.contains("95%")
            && over.len() == 1
            && over[0].0 == Severity::Error
            && over[0].1.contains("10.1/10.0"),
        detail: format!(
            "9.5/10 → {:?}, 10.1/10 → {:?}",
            near.iter().map(|f| f.0).collect::<Vec<_>>(),
            over.iter().map(|f| f.0).collect::<Vec<_>>()
        ),
    });

    // Idempotence and JSON round trip on a messy layout
    let messy = state;
    let first = validate(&messy);
    let idempotent = first == validate(&messy);
    let reloaded = to_json_string(&messy)
        .ok()
        .and_then(|json| from_json_str(&json).ok());
    let same_after_reload = reloaded
        .as_ref()
        .is_some_and(|loaded| *loaded == messy && validate(loaded) == first);
    results.push(TestResult {
        name: "rule_idempotent".into(),
        passed: idempotent,
        detail: format!("{} findings, stable across runs", first.len()),
    });
    results.push(TestResult {
        name: "rule_json_roundtrip".into(),
        passed: same_after_reload,
        detail: "saved and reloaded layout gives identical findings".into(),
    });

    if verbose {
        println!("  Findings for the port-reuse layout:");
        for f in &first {
            println!("    {}", describe(f));
        }
    }

    results
}

// ── 3. Editor Scenarios ─────────────────────────────────────────────────

/// Galley with hygiene to the east and medical to the south.
fn starter_habitat(catalog: &Catalog, grid: f64) -> Result<LayoutState, EditError> {
    let state = LayoutState::new(2);
    let (state, galley) = place_main_module(&state, catalog, "galley", 0.0, 0.0, grid)?;
    let (state, hygiene) = place_main_module(&state, catalog, "hygiene", 3.0, 0.0, grid)?;
    let (state, medical) = place_main_module(&state, catalog, "medical", 0.0, 3.0, grid)?;
    let (state, _) = connect_ports(&state, &galley, "p-e", &hygiene, "p-w")?;
    let (state, _) = connect_ports(&state, &galley, "p-s", &medical, "p-n")?;
    Ok(state)
}

fn stove_at(x: f64, y: f64) -> SubPlacement<'static> {
    SubPlacement {
        type_id: "stove",
        x,
        y,
        z: 0.0,
        anchor: Anchor::Floor,
    }
}

fn validate_editor_scenarios(config: &HabitatConfig, verbose: bool) -> Vec<TestResult> {
    println!("--- Editor Scenarios ---");
    let mut results = Vec::new();
    let catalog = Catalog::standard();
    // Fixed grid so the scenario coordinates stay on grid lines.
    let grid = EditorConfig::default().grid_size;

    let starter = match starter_habitat(&catalog, grid) {
        Ok(state) => state,
        Err(e) => {
            results.push(TestResult::failed_edit("editor_starter_habitat", e));
            return results;
        }
    };
    let findings = validate_with(&starter, &config.validation);
    let errors: Vec<&Finding> = findings.iter().filter(|f| f.is_error()).collect();
    results.push(TestResult {
        name: "editor_starter_habitat".into(),
        passed: errors.is_empty(),
        detail: format!(
            "galley + hygiene + medical for 2 crew: {} error(s)",
            errors.len()
        ),
    });

    // Cascade delete through the session
    let cascade = (|| {
        let mut session = EditorSession::new(starter.clone());
        session.zoom_into("galley-1")?;
        let stove = session.place_sub_module(&catalog, &stove_at(0.5, 0.5))?;
        session.select_main_module("galley-1")?;
        session.delete_selected()?;
        let layout = &session.layout;
        Ok::<_, EditError>(
            layout.main_modules.len() == 2
                && layout.sub_module(&stove).is_none()
                && layout.connections.is_empty()
                && session.selection.zoomed_module_id.is_none()
                && session.selection.selected_main_module_id.is_none()
                && matching(&session.findings(), "non-existent").is_empty(),
        )
    })();
    results.push(match cascade {
        Ok(passed) => TestResult {
            name: "editor_delete_cascade".into(),
            passed,
            detail: "module, sub-modules, connections and selection removed together".into(),
        },
        Err(e) => TestResult::failed_edit("editor_delete_cascade", e),
    });

    // Copy-on-write: the input snapshot never changes
    let before = starter.clone();
    let untouched = rotate_main_module(&starter, "galley-1")
        .and_then(|_| delete_main_module(&starter, "hygiene-1"))
        .map(|_| starter == before);
    results.push(match untouched {
        Ok(passed) => TestResult {
            name: "editor_copy_on_write".into(),
            passed,
            detail: "rotate and delete leave the input layout unchanged".into(),
        },
        Err(e) => TestResult::failed_edit("editor_copy_on_write", e),
    });

    // Drag a sub-module across parents and out into space
    let drag = (|| {
        let (state, stove) =
            place_sub_module(&starter, &catalog, Some("galley-1"), &stove_at(0.5, 0.5))?;
        let (_, stays) = move_sub_module(&state, &stove, 2.5, 1.0)?;
        let (moved, across) = move_sub_module(&state, &stove, 3.5, 0.5)?;
        let (_, away) = move_sub_module(&state, &stove, 40.0, 40.0)?;
        let not_allowed = matching(&validate(&moved), "is not allowed").len();
        Ok::<_, EditError>((stays, across, away, not_allowed))
    })();
    results.push(match drag {
        Ok((stays, across, away, not_allowed)) => TestResult {
            name: "editor_sub_module_drag".into(),
            passed: stays == SubMoveOutcome::Moved
                && across == SubMoveOutcome::Reparented("hygiene-1".into())
                && away == SubMoveOutcome::Removed
                && not_allowed == 1,
            detail: format!("{:?} / {:?} / {:?}", stays, across, away),
        },
        Err(e) => TestResult::failed_edit("editor_sub_module_drag", e),
    });

    // A port takes one connection
    let reuse = connect_ports(&starter, "medical-1", "p-n", "hygiene-1", "p-e");
    results.push(TestResult {
        name: "editor_port_single_use".into(),
        passed: matches!(reuse, Err(EditError::PortInUse { .. })),
        detail: match reuse {
            Ok(_) => "second connection on medical-1:p-n was accepted".into(),
            Err(e) => e.to_string(),
        },
    });

    // Incompatible hatch is allowed by the editor and flagged by the validator
    let hatch = (|| {
        let (state, airlock) = place_main_module(&starter, &catalog, "airlock", 0.0, -2.0, grid)?;
        let (state, _) = connect_ports(&state, &airlock, "p-out", "galley-1", "p-n")?;
        Ok::<_, EditError>(can_switch_to_3d(&state))
    })();
    results.push(match hatch {
        Ok(gate) => TestResult {
            name: "editor_incompatible_hatch".into(),
            passed: !gate.allowed && gate.errors.iter().any(|f| f.message.contains("Incompatible")),
            detail: format!("3D blocked by {} error(s)", gate.errors.len()),
        },
        Err(e) => TestResult::failed_edit("editor_incompatible_hatch", e),
    });

    let summary = summarize(&starter);
    results.push(TestResult {
        name: "editor_summary".into(),
        passed: summary.main_module_count == 3
            && summary.connection_count == 2
            && (summary.total_volume - 55.0).abs() < 1e-9,
        detail: format!(
            "{:.1} m³, {:.0} kg, {:.1} m³/crew",
            summary.total_volume, summary.total_mass, summary.volume_per_crew
        ),
    });

    if verbose {
        println!("  Starter habitat:");
        for m in &starter.main_modules {
            let rect = footprint(m);
            println!(
                "    {:12} at ({:.1}, {:.1}) {:.1}×{:.1} m",
                m.instance_id, rect.x, rect.y, rect.width, rect.depth
            );
        }
    }

    results
}

// ── 4. Random Sweep ─────────────────────────────────────────────────────

/// A layout built the way a user would: drops, turns, links, furniture,
/// the odd delete and drag. Rejected edits are skipped.
fn random_layout(rng: &mut impl Rng, catalog: &Catalog, grid: f64) -> LayoutState {
    let mut state = LayoutState::new(rng.gen_range(1..=12));

    for _ in 0..rng.gen_range(0..=8) {
        let module_type = &catalog.main_modules[rng.gen_range(0..catalog.main_modules.len())];
        let x = rng.gen_range(-10.0..10.0);
        let y = rng.gen_range(-10.0..10.0);
        if let Ok((next, id)) = place_main_module(&state, catalog, &module_type.id, x, y, grid) {
            state = next;
            for _ in 0..rng.gen_range(0..4) {
                if let Ok(next) = rotate_main_module(&state, &id) {
                    state = next;
                }
            }
        }
    }
    if state.is_empty() {
        return state;
    }

    for _ in 0..rng.gen_range(0..10) {
        let n = state.main_modules.len();
        let from = &state.main_modules[rng.gen_range(0..n)];
        let to = &state.main_modules[rng.gen_range(0..n)];
        if from.module_type.ports.is_empty() || to.module_type.ports.is_empty() {
            continue;
        }
        let from_port = &from.module_type.ports[rng.gen_range(0..from.module_type.ports.len())];
        let to_port = &to.module_type.ports[rng.gen_range(0..to.module_type.ports.len())];
        if let Ok((next, _)) = connect_ports(
            &state,
            &from.instance_id,
            &from_port.id,
            &to.instance_id,
            &to_port.id,
        ) {
            state = next;
        }
    }

    for _ in 0..rng.gen_range(0..6) {
        let parent = &state.main_modules[rng.gen_range(0..state.main_modules.len())];
        let allowed = &parent.module_type.allowed_sub_modules;
        if allowed.is_empty() {
            continue;
        }
        let type_id = &allowed[rng.gen_range(0..allowed.len())];
        let Some(sub_type) = catalog.sub_module(type_id) else {
            continue;
        };
        if sub_type.allowed_anchors.is_empty() {
            continue;
        }
        let placement = SubPlacement {
            type_id,
            x: rng.gen_range(0.0..parent.module_type.width),
            y: rng.gen_range(0.0..parent.module_type.depth),
            z: rng.gen_range(0.0..2.0),
            anchor: sub_type.allowed_anchors[rng.gen_range(0..sub_type.allowed_anchors.len())],
        };
        if let Ok((next, _)) =
            place_sub_module(&state, catalog, Some(parent.instance_id.as_str()), &placement)
        {
            state = next;
        }
    }

    if !state.sub_modules.is_empty() && rng.gen_bool(0.3) {
        let id = state.sub_modules[rng.gen_range(0..state.sub_modules.len())]
            .instance_id
            .clone();
        let (x, y) = (rng.gen_range(-10.0..12.0), rng.gen_range(-10.0..12.0));
        if let Ok((next, _)) = move_sub_module(&state, &id, x, y) {
            state = next;
        }
    }
    if rng.gen_bool(0.2) {
        let id = state.main_modules[rng.gen_range(0..state.main_modules.len())]
            .instance_id
            .clone();
        if let Ok(next) = delete_main_module(&state, &id) {
            state = next;
        }
    }
    state
}

fn sweep_random_layouts(config: &HabitatConfig, seed: u64, verbose: bool) -> Vec<TestResult> {
    println!("--- Random Sweep (seed {}) ---", seed);
    let mut results = Vec::new();
    let catalog = Catalog::standard();
    let mut rng = StdRng::seed_from_u64(seed);

    let mut panics = 0;
    let mut unstable = 0;
    let mut roundtrip_failures = 0;
    let mut port_reuse = 0;
    let mut ready = 0;
    let mut total_findings = 0;

    for i in 0..SWEEP_LAYOUTS {
        let state = random_layout(&mut rng, &catalog, config.editor.grid_size);

        let run =
            panic::catch_unwind(AssertUnwindSafe(|| validate_with(&state, &config.validation)));
        let Ok(findings) = run else {
            panics += 1;
            if verbose {
                println!("  layout {} panicked the validator", i);
            }
            continue;
        };

        if findings != validate_with(&state, &config.validation) {
            unstable += 1;
        }
        let reloaded = to_json_string(&state)
            .ok()
            .and_then(|json| from_json_str(&json).ok());
        match reloaded {
            Some(loaded) if validate_with(&loaded, &config.validation) == findings => {}
            _ => roundtrip_failures += 1,
        }
        if findings.iter().any(|f| f.message.contains("connections (max 1)")) {
            port_reuse += 1;
        }
        if !state.is_empty() && !has_errors(&findings) {
            ready += 1;
        }
        total_findings += findings.len();
    }

    results.push(TestResult {
        name: "sweep_no_panics".into(),
        passed: panics == 0,
        detail: format!("{} layouts, {} panics", SWEEP_LAYOUTS, panics),
    });
    results.push(TestResult {
        name: "sweep_idempotent".into(),
        passed: unstable == 0,
        detail: format!("{} layouts gave different findings on re-run", unstable),
    });
    results.push(TestResult {
        name: "sweep_json_roundtrip".into(),
        passed: roundtrip_failures == 0,
        detail: format!("{} layouts changed after save/load", roundtrip_failures),
    });
    results.push(TestResult {
        name: "sweep_ports_single_use".into(),
        passed: port_reuse == 0,
        detail: format!("{} layouts with a double-booked port", port_reuse),
    });

    if verbose {
        println!(
            "  {} of {} layouts ready for 3D, {:.1} findings per layout",
            ready,
            SWEEP_LAYOUTS,
            total_findings as f64 / SWEEP_LAYOUTS as f64
        );
    }

    results
}

// ── 5. Layout File ──────────────────────────────────────────────────────

fn describe(f: &Finding) -> String {
    let label = match f.severity {
        Severity::Error => "error",
        Severity::Warning => "warning",
    };
    match &f.module_id {
        Some(id) => format!("[{}] {} ({})", label, f.message, id),
        None => format!("[{}] {}", label, f.message),
    }
}

fn check_layout_file(path: &Path, config: &HabitatConfig, verbose: bool) -> Vec<TestResult> {
    println!("--- Layout File ---");

    let state = match load_from_path(path) {
        Ok(state) => state,
        Err(e) => {
            return vec![TestResult {
                name: "layout_load".into(),
                passed: false,
                detail: format!("{}: {}", path.display(), e),
            }];
        }
    };

    let summary = summarize(&state);
    println!(
        "  {}: {} modules, {} sub-modules, {} connections, {:.1} m³ for {} crew",
        path.display(),
        summary.main_module_count,
        summary.sub_module_count,
        summary.connection_count,
        summary.total_volume,
        summary.crew_size
    );
    if verbose {
        match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{}", json),
            Err(e) => println!("  (summary not serializable: {})", e),
        }
    }

    let findings = validate_with(&state, &config.validation);
    for f in &findings {
        println!("  {}", describe(f));
    }
    let errors = findings.iter().filter(|f| f.is_error()).count();
    let ready = !has_errors(&findings) && !state.is_empty();
    println!("  3D view: {}", if ready { "available" } else { "blocked" });

    vec![TestResult {
        name: "layout_load".into(),
        passed: true,
        detail: format!(
            "{}: {} errors, {} warnings",
            path.display(),
            errors,
            findings.len() - errors
        ),
    }]
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn defaults_without_flags() {
        let args = Args::try_parse_from(["habplan-simtest"]).unwrap();
        assert!(!args.verbose);
        assert_eq!(args.seed, DEFAULT_SEED);
        assert!(args.layout.is_none());
        assert!(args.config.is_none());
    }

    #[test]
    fn seed_accepts_both_spellings() {
        let joined = Args::try_parse_from(["habplan-simtest", "--seed=7"]).unwrap();
        assert_eq!(joined.seed, 7);
        let split = Args::try_parse_from(["habplan-simtest", "--seed", "7"]).unwrap();
        assert_eq!(split.seed, 7);
    }

    #[test]
    fn files_and_verbose_flags() {
        let args = Args::try_parse_from([
            "habplan-simtest",
            "-v",
            "--layout",
            "habitat.json",
            "--config=habplan.json",
        ])
        .unwrap();
        assert!(args.verbose);
        assert_eq!(args.layout, Some(PathBuf::from("habitat.json")));
        assert_eq!(args.config, Some(PathBuf::from("habplan.json")));
    }

    #[test]
    fn help_is_shown_not_rejected() {
        let err = Args::try_parse_from(["habplan-simtest", "--help"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);
    }

    #[test]
    fn bad_input_is_rejected() {
        let err = Args::try_parse_from(["habplan-simtest", "--seed", "many"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
        let err = Args::try_parse_from(["habplan-simtest", "--bogus"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownArgument);
    }

    #[test]
    fn verbose_turns_on_debug_logging() {
        assert_eq!(log_filter(true, None), "debug");
        assert_eq!(log_filter(true, Some("warn")), "debug");
    }

    #[test]
    fn rust_log_applies_when_not_verbose() {
        assert_eq!(log_filter(false, Some("habplan_logic=debug")), "habplan_logic=debug");
        assert_eq!(log_filter(false, Some("  ")), "error");
        assert_eq!(log_filter(false, None), "error");
    }

    #[test]
    fn log_filters_parse() {
        for verbose in [true, false] {
            assert!(EnvFilter::try_new(log_filter(verbose, None)).is_ok());
        }
    }
}
