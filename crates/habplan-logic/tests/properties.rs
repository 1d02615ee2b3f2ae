//! Property tests over random layouts built from the standard catalogue.

use habplan_logic::catalog::{are_ports_compatible, Catalog, PortType};
use habplan_logic::editor::{connect_ports, place_main_module};
use habplan_logic::geometry::{footprint, port_world_position, Rect, Rotation};
use habplan_logic::layout::LayoutState;
use habplan_logic::persistence::{from_json_str, to_json_string};
use habplan_logic::validation::{can_switch_to_3d, validate};
use proptest::prelude::*;

type Placement = (usize, i32, i32, u16);
type Link = (usize, usize, usize, usize);

fn rotation_strategy() -> impl Strategy<Value = Rotation> {
    prop::sample::select(vec![Rotation::R0, Rotation::R90, Rotation::R180, Rotation::R270])
}

fn port_type_strategy() -> impl Strategy<Value = PortType> {
    prop::sample::select(PortType::ALL.to_vec())
}

fn rect_strategy() -> impl Strategy<Value = Rect> {
    (-20.0f64..20.0, -20.0f64..20.0, 0.5f64..6.0, 0.5f64..6.0)
        .prop_map(|(x, y, w, d)| Rect::new(x, y, w, d))
}

/// Place modules on the half-metre grid and attempt the given links.
/// Rejected edits are skipped, the way a user's failed drag would be.
fn build_layout(crew: u32, placements: &[Placement], links: &[Link]) -> LayoutState {
    let catalog = Catalog::standard();
    let mut state = LayoutState::new(crew);
    for &(type_index, gx, gy, turns) in placements {
        let type_id = catalog.main_modules[type_index % catalog.main_modules.len()]
            .id
            .clone();
        if let Ok((mut next, id)) =
            place_main_module(&state, &catalog, &type_id, gx as f64 * 0.5, gy as f64 * 0.5, 0.5)
        {
            if let Some(m) = next.main_modules.iter_mut().find(|m| m.instance_id == id) {
                for _ in 0..turns {
                    m.rotation = m.rotation.next();
                }
            }
            state = next;
        }
    }

    for &(a, b, pa, pb) in links {
        if state.main_modules.is_empty() {
            break;
        }
        let from = &state.main_modules[a % state.main_modules.len()];
        let to = &state.main_modules[b % state.main_modules.len()];
        let from_port = &from.module_type.ports[pa % from.module_type.ports.len()];
        let to_port = &to.module_type.ports[pb % to.module_type.ports.len()];
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
    state
}

fn layout_strategy() -> impl Strategy<Value = LayoutState> {
    (
        1u32..12,
        prop::collection::vec((0usize..9, -20i32..20, -20i32..20, 0u16..4), 0..8),
        prop::collection::vec((0usize..8, 0usize..8, 0usize..4, 0usize..4), 0..12),
    )
        .prop_map(|(crew, placements, links)| build_layout(crew, &placements, &links))
}

proptest! {
    #[test]
    fn port_compatibility_is_symmetric(a in port_type_strategy(), b in port_type_strategy()) {
        prop_assert_eq!(are_ports_compatible(a, b), are_ports_compatible(b, a));
    }

    #[test]
    fn standard_ports_always_mate(a in port_type_strategy()) {
        prop_assert!(are_ports_compatible(a, PortType::Std));
        prop_assert!(are_ports_compatible(a, a));
    }

    #[test]
    fn overlap_is_symmetric(a in rect_strategy(), b in rect_strategy(), tol in 0.0f64..0.1) {
        prop_assert_eq!(a.overlaps(&b, tol), b.overlaps(&a, tol));
    }

    #[test]
    fn rotation_keeps_footprint_area(rotation in rotation_strategy(), type_index in 0usize..9) {
        let catalog = Catalog::standard();
        let module_type = &catalog.main_modules[type_index];
        let (state, id) = place_main_module(
            &LayoutState::new(1),
            &catalog,
            &module_type.id,
            0.0,
            0.0,
            0.5,
        )
        .unwrap();
        let mut module = state.main_module(&id).unwrap().clone();
        module.rotation = rotation;

        let rect = footprint(&module);
        let area = module_type.width * module_type.depth;
        prop_assert!((rect.width * rect.depth - area).abs() < 1e-9);
        if rotation.swaps_axes() {
            prop_assert_eq!((rect.width, rect.depth), (module_type.depth, module_type.width));
        }

        // Ports stay on the rotated outline.
        for port in &module.module_type.ports {
            let (px, py) = port_world_position(&module, port);
            prop_assert!(
                rect.contains_point(px, py),
                "port {} at ({}, {}) outside {:?}",
                port.id,
                px,
                py,
                rect
            );
        }
    }

    #[test]
    fn rotation_survives_json(rotation in rotation_strategy()) {
        let json = serde_json::to_string(&rotation).unwrap();
        prop_assert_eq!(serde_json::from_str::<Rotation>(&json).unwrap(), rotation);
    }

    #[test]
    fn validation_is_idempotent(state in layout_strategy()) {
        prop_assert_eq!(validate(&state), validate(&state));
    }

    #[test]
    fn editor_never_double_books_ports(state in layout_strategy()) {
        let findings = validate(&state);
        prop_assert!(!findings.iter().any(|f| f.message.contains("connections (max 1)")));
        prop_assert!(!findings.iter().any(|f| f.message.contains("non-existent")));
    }

    #[test]
    fn saved_layouts_validate_the_same(state in layout_strategy()) {
        let loaded = from_json_str(&to_json_string(&state).unwrap()).unwrap();
        prop_assert_eq!(validate(&loaded), validate(&state));
    }

    #[test]
    fn gate_matches_findings(state in layout_strategy()) {
        let gate = can_switch_to_3d(&state);
        let errors = validate(&state).into_iter().filter(|f| f.is_error()).count();
        prop_assert_eq!(gate.allowed, errors == 0 && !state.is_empty());
        prop_assert_eq!(gate.errors.len(), errors);
    }
}
