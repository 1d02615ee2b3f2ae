//! Layout mutations for the editor front-end.
//!
//! Every operation borrows the current [`LayoutState`] and returns a new
//! one, so the validator only ever sees whole snapshots. Cascades (deleting
//! a module together with its sub-modules and connections) happen inside a
//! single operation.
//!
//! Selection and zoom context are UI state and live in [`Selection`],
//! carried next to the layout by [`EditorSession`].

use crate::catalog::{Anchor, Catalog};
use crate::constants::id_prefix;
use crate::geometry::{footprint, snap_to_grid, Rect, Rotation};
use crate::layout::{Connection, LayoutState, PlacedMainModule, PlacedSubModule};
use crate::validation::{can_switch_to_3d, validate, Finding, ModeGate};
use thiserror::Error;

/// Why an edit was refused. The layout is left unchanged.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EditError {
    #[error("unknown module type '{0}'")]
    UnknownModuleType(String),
    #[error("no main module with id '{0}'")]
    UnknownModule(String),
    #[error("no sub-module with id '{0}'")]
    UnknownSubModule(String),
    #[error("module '{module}' has no port '{port}'")]
    UnknownPort { module: String, port: String },
    #[error("no connection with id '{0}'")]
    UnknownConnection(String),
    #[error("sub-modules can only be placed while zoomed into a module")]
    NoZoomContext,
    #[error("sub-module type '{sub_module}' is not allowed in module type '{module}'")]
    SubModuleNotAllowed { module: String, sub_module: String },
    #[error("sub-module type '{sub_module}' cannot be mounted on the {anchor:?}")]
    AnchorNotAllowed { sub_module: String, anchor: Anchor },
    #[error("cannot connect module '{0}' to itself")]
    SelfConnection(String),
    #[error("port '{port}' on module '{module}' is already connected")]
    PortInUse { module: String, port: String },
    #[error("module '{module}' already has its maximum of {max} connections")]
    MaxConnections { module: String, max: u32 },
    #[error("crew size must be at least 1")]
    InvalidCrewSize,
}

fn fail<T>(err: EditError) -> Result<T, EditError> {
    log::warn!("Edit rejected: {}", err);
    Err(err)
}

// ── Main modules ────────────────────────────────────────────────────────

/// Drop a new main module of `type_id` at a grid-snapped position.
/// Returns the new layout and the new instance id.
pub fn place_main_module(
    state: &LayoutState,
    catalog: &Catalog,
    type_id: &str,
    x: f64,
    y: f64,
    grid: f64,
) -> Result<(LayoutState, String), EditError> {
    let Some(module_type) = catalog.main_module(type_id) else {
        return fail(EditError::UnknownModuleType(type_id.to_string()));
    };

    let instance_id = state.next_instance_id(type_id);
    let (x, y) = (snap_to_grid(x, grid), snap_to_grid(y, grid));
    let mut next = state.clone();
    next.main_modules.push(PlacedMainModule {
        instance_id: instance_id.clone(),
        x,
        y,
        rotation: Rotation::R0,
        module_type: module_type.clone(),
    });
    log::debug!("Placed {} at ({:.2}, {:.2})", instance_id, x, y);
    Ok((next, instance_id))
}

/// Drag-end for a main module. Sub-modules use parent-relative
/// coordinates, so they move along without being touched.
pub fn move_main_module(
    state: &LayoutState,
    instance_id: &str,
    x: f64,
    y: f64,
    grid: f64,
) -> Result<LayoutState, EditError> {
    let Some(index) = state
        .main_modules
        .iter()
        .position(|m| m.instance_id == instance_id)
    else {
        return fail(EditError::UnknownModule(instance_id.to_string()));
    };

    let mut next = state.clone();
    let module = &mut next.main_modules[index];
    module.x = snap_to_grid(x, grid);
    module.y = snap_to_grid(y, grid);
    Ok(next)
}

/// Rotate a main module a quarter turn clockwise.
pub fn rotate_main_module(
    state: &LayoutState,
    instance_id: &str,
) -> Result<LayoutState, EditError> {
    let Some(index) = state
        .main_modules
        .iter()
        .position(|m| m.instance_id == instance_id)
    else {
        return fail(EditError::UnknownModule(instance_id.to_string()));
    };

    let mut next = state.clone();
    let module = &mut next.main_modules[index];
    module.rotation = module.rotation.next();
    Ok(next)
}

/// Remove a main module, its sub-modules and every connection touching it,
/// as one replacement.
pub fn delete_main_module(
    state: &LayoutState,
    instance_id: &str,
) -> Result<LayoutState, EditError> {
    if state.main_module(instance_id).is_none() {
        return fail(EditError::UnknownModule(instance_id.to_string()));
    }

    let next = LayoutState {
        crew_size: state.crew_size,
        main_modules: state
            .main_modules
            .iter()
            .filter(|m| m.instance_id != instance_id)
            .cloned()
            .collect(),
        sub_modules: state
            .sub_modules
            .iter()
            .filter(|s| s.parent_instance_id != instance_id)
            .cloned()
            .collect(),
        connections: state
            .connections
            .iter()
            .filter(|c| !c.touches(instance_id))
            .cloned()
            .collect(),
    };
    log::debug!(
        "Deleted {} ({} sub-modules, {} connections removed)",
        instance_id,
        state.sub_modules.len() - next.sub_modules.len(),
        state.connections.len() - next.connections.len()
    );
    Ok(next)
}

// ── Sub-modules ─────────────────────────────────────────────────────────

/// Where and how to drop a sub-module inside the zoomed parent.
#[derive(Debug, Clone, PartialEq)]
pub struct SubPlacement<'a> {
    pub type_id: &'a str,
    /// Position relative to the parent's origin (m).
    pub x: f64,
    pub y: f64,
    /// Requested height for wall mounts; floor and ceiling mounts ignore it.
    pub z: f64,
    pub anchor: Anchor,
}

/// Drop a sub-module into the zoomed parent. Fails without a zoom context.
pub fn place_sub_module(
    state: &LayoutState,
    catalog: &Catalog,
    zoomed_module_id: Option<&str>,
    placement: &SubPlacement<'_>,
) -> Result<(LayoutState, String), EditError> {
    let Some(parent_id) = zoomed_module_id else {
        return fail(EditError::NoZoomContext);
    };
    let Some(parent) = state.main_module(parent_id) else {
        return fail(EditError::UnknownModule(parent_id.to_string()));
    };
    let Some(sub_type) = catalog.sub_module(placement.type_id) else {
        return fail(EditError::UnknownModuleType(placement.type_id.to_string()));
    };
    if !parent.module_type.allows_sub_module(&sub_type.id) {
        return fail(EditError::SubModuleNotAllowed {
            module: parent.type_id().to_string(),
            sub_module: sub_type.id.clone(),
        });
    }
    if !sub_type.allows_anchor(placement.anchor) {
        return fail(EditError::AnchorNotAllowed {
            sub_module: sub_type.id.clone(),
            anchor: placement.anchor,
        });
    }

    let z = if !sub_type.z_aware {
        0.0
    } else {
        match placement.anchor {
            Anchor::Floor => 0.0,
            Anchor::Ceiling => (parent.module_type.height - sub_type.height).max(0.0),
            Anchor::Wall => placement.z.max(0.0),
        }
    };

    let instance_id = state.next_instance_id(&sub_type.id);
    let mut next = state.clone();
    next.sub_modules.push(PlacedSubModule {
        instance_id: instance_id.clone(),
        parent_instance_id: parent_id.to_string(),
        x: placement.x,
        y: placement.y,
        z,
        anchor: Some(placement.anchor),
        module_type: sub_type.clone(),
    });
    Ok((next, instance_id))
}

/// What happened to a dragged sub-module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubMoveOutcome {
    /// Still inside its original parent.
    Moved,
    /// Dropped onto another main module, now its child.
    Reparented(String),
    /// Dropped outside every main module and removed.
    Removed,
}

/// Drag-end for a sub-module. `world_x`/`world_y` is the new top-left
/// corner in canvas coordinates.
pub fn move_sub_module(
    state: &LayoutState,
    instance_id: &str,
    world_x: f64,
    world_y: f64,
) -> Result<(LayoutState, SubMoveOutcome), EditError> {
    let Some(index) = state
        .sub_modules
        .iter()
        .position(|s| s.instance_id == instance_id)
    else {
        return fail(EditError::UnknownSubModule(instance_id.to_string()));
    };

    let sub = &state.sub_modules[index];
    let moved = Rect::new(
        world_x,
        world_y,
        sub.module_type.width,
        sub.module_type.depth,
    );

    let stays = state
        .main_module(&sub.parent_instance_id)
        .filter(|parent| footprint(parent).intersects(&moved));
    let target = stays.or_else(|| {
        let (cx, cy) = moved.center();
        state
            .main_modules
            .iter()
            .find(|m| footprint(m).contains_point(cx, cy))
    });

    let mut next = state.clone();
    let Some(target) = target else {
        next.sub_modules.remove(index);
        log::debug!("Removed {} (dropped outside every module)", instance_id);
        return Ok((next, SubMoveOutcome::Removed));
    };

    let outcome = if target.instance_id == sub.parent_instance_id {
        SubMoveOutcome::Moved
    } else {
        SubMoveOutcome::Reparented(target.instance_id.clone())
    };
    let moved_sub = &mut next.sub_modules[index];
    moved_sub.parent_instance_id = target.instance_id.clone();
    moved_sub.x = world_x - target.x;
    moved_sub.y = world_y - target.y;
    Ok((next, outcome))
}

pub fn delete_sub_module(state: &LayoutState, instance_id: &str) -> Result<LayoutState, EditError> {
    if state.sub_module(instance_id).is_none() {
        return fail(EditError::UnknownSubModule(instance_id.to_string()));
    }
    let mut next = state.clone();
    next.sub_modules.retain(|s| s.instance_id != instance_id);
    Ok(next)
}

// ── Connections ─────────────────────────────────────────────────────────

/// Connect two ports.
///
/// Refuses any port that is already connected, which also rules out exact
/// duplicate connections. Port-type compatibility is left to the
/// validator so the user sees it as a finding.
pub fn connect_ports(
    state: &LayoutState,
    from_module_id: &str,
    from_port_id: &str,
    to_module_id: &str,
    to_port_id: &str,
) -> Result<(LayoutState, String), EditError> {
    if from_module_id == to_module_id {
        return fail(EditError::SelfConnection(from_module_id.to_string()));
    }

    for (module_id, port_id) in [(from_module_id, from_port_id), (to_module_id, to_port_id)] {
        let Some(module) = state.main_module(module_id) else {
            return fail(EditError::UnknownModule(module_id.to_string()));
        };
        if module.module_type.port(port_id).is_none() {
            return fail(EditError::UnknownPort {
                module: module_id.to_string(),
                port: port_id.to_string(),
            });
        }
        if state.port_in_use(module_id, port_id) {
            return fail(EditError::PortInUse {
                module: module_id.to_string(),
                port: port_id.to_string(),
            });
        }
        if let Some(max) = module.module_type.max_connections {
            if state.connections_of(module_id).count() >= max as usize {
                return fail(EditError::MaxConnections {
                    module: module_id.to_string(),
                    max,
                });
            }
        }
    }

    let id = state.next_instance_id(id_prefix::CONNECTION);
    let mut next = state.clone();
    next.connections.push(Connection {
        id: id.clone(),
        from_module_id: from_module_id.to_string(),
        from_port_id: from_port_id.to_string(),
        to_module_id: to_module_id.to_string(),
        to_port_id: to_port_id.to_string(),
    });
    log::debug!(
        "Connected {}:{} -> {}:{} as {}",
        from_module_id,
        from_port_id,
        to_module_id,
        to_port_id,
        id
    );
    Ok((next, id))
}

pub fn disconnect(state: &LayoutState, connection_id: &str) -> Result<LayoutState, EditError> {
    if !state.connections.iter().any(|c| c.id == connection_id) {
        return fail(EditError::UnknownConnection(connection_id.to_string()));
    }
    let mut next = state.clone();
    next.connections.retain(|c| c.id != connection_id);
    Ok(next)
}

pub fn set_crew_size(state: &LayoutState, crew_size: u32) -> Result<LayoutState, EditError> {
    if crew_size == 0 {
        return fail(EditError::InvalidCrewSize);
    }
    let mut next = state.clone();
    next.crew_size = crew_size;
    Ok(next)
}

// ── Session ─────────────────────────────────────────────────────────────

/// Transient UI references. None of these own anything; they are cleared
/// when the referenced instance disappears.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub selected_main_module_id: Option<String>,
    pub selected_sub_module_id: Option<String>,
    pub zoomed_module_id: Option<String>,
}

/// Layout plus UI selection. The validator is only ever handed `layout`.
#[derive(Debug, Clone, Default)]
pub struct EditorSession {
    pub layout: LayoutState,
    pub selection: Selection,
}

impl EditorSession {
    pub fn new(layout: LayoutState) -> Self {
        Self {
            layout,
            selection: Selection::default(),
        }
    }

    /// Replace the layout, dropping selection ids that no longer resolve.
    pub fn apply(&mut self, layout: LayoutState) {
        self.layout = layout;
        let layout = &self.layout;
        let sel = &mut self.selection;
        let gone_main = |id: &Option<String>| {
            id.as_deref()
                .is_some_and(|id| layout.main_module(id).is_none())
        };
        if gone_main(&sel.selected_main_module_id) {
            sel.selected_main_module_id = None;
        }
        if gone_main(&sel.zoomed_module_id) {
            sel.zoomed_module_id = None;
        }
        if sel
            .selected_sub_module_id
            .as_deref()
            .is_some_and(|id| layout.sub_module(id).is_none())
        {
            sel.selected_sub_module_id = None;
        }
    }

    pub fn select_main_module(&mut self, instance_id: &str) -> Result<(), EditError> {
        if self.layout.main_module(instance_id).is_none() {
            return fail(EditError::UnknownModule(instance_id.to_string()));
        }
        self.selection.selected_main_module_id = Some(instance_id.to_string());
        self.selection.selected_sub_module_id = None;
        Ok(())
    }

    pub fn select_sub_module(&mut self, instance_id: &str) -> Result<(), EditError> {
        if self.layout.sub_module(instance_id).is_none() {
            return fail(EditError::UnknownSubModule(instance_id.to_string()));
        }
        self.selection.selected_sub_module_id = Some(instance_id.to_string());
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.selection.selected_main_module_id = None;
        self.selection.selected_sub_module_id = None;
    }

    /// Enter the interior view of a main module, where sub-modules can be
    /// dropped.
    pub fn zoom_into(&mut self, instance_id: &str) -> Result<(), EditError> {
        if self.layout.main_module(instance_id).is_none() {
            return fail(EditError::UnknownModule(instance_id.to_string()));
        }
        self.selection.zoomed_module_id = Some(instance_id.to_string());
        Ok(())
    }

    pub fn zoom_out(&mut self) {
        self.selection.zoomed_module_id = None;
        self.selection.selected_sub_module_id = None;
    }

    pub fn zoomed_module(&self) -> Option<&PlacedMainModule> {
        self.selection
            .zoomed_module_id
            .as_deref()
            .and_then(|id| self.layout.main_module(id))
    }

    /// Drop a sub-module into the zoomed module.
    pub fn place_sub_module(
        &mut self,
        catalog: &Catalog,
        placement: &SubPlacement<'_>,
    ) -> Result<String, EditError> {
        let (layout, id) = place_sub_module(
            &self.layout,
            catalog,
            self.selection.zoomed_module_id.as_deref(),
            placement,
        )?;
        self.apply(layout);
        Ok(id)
    }

    /// Delete key: removes the selected sub-module if any, otherwise the
    /// selected main module with everything attached to it.
    pub fn delete_selected(&mut self) -> Result<(), EditError> {
        let layout = if let Some(id) = self.selection.selected_sub_module_id.clone() {
            delete_sub_module(&self.layout, &id)?
        } else if let Some(id) = self.selection.selected_main_module_id.clone() {
            delete_main_module(&self.layout, &id)?
        } else {
            return Ok(());
        };
        self.apply(layout);
        Ok(())
    }

    /// Rotate key: turns the selected main module.
    pub fn rotate_selected(&mut self) -> Result<(), EditError> {
        let Some(id) = self.selection.selected_main_module_id.clone() else {
            return Ok(());
        };
        let layout = rotate_main_module(&self.layout, &id)?;
        self.apply(layout);
        Ok(())
    }

    pub fn findings(&self) -> Vec<Finding> {
        validate(&self.layout)
    }

    pub fn mode_gate(&self) -> ModeGate {
        can_switch_to_3d(&self.layout)
    }
}
