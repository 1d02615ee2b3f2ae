//! Planar geometry for the floor plan.
//!
//! Coordinates are meters with the origin at the canvas top-left, `x` to
//! the right and `y` downwards. Rotations are clockwise on screen.

use crate::catalog::{Port, PortSide};
use crate::layout::PlacedMainModule;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Quarter-turn orientation of a placed main module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum Rotation {
    #[default]
    R0,
    R90,
    R180,
    R270,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("rotation must be 0, 90, 180 or 270 degrees, got {0}")]
pub struct InvalidRotation(pub u16);

impl Rotation {
    pub fn degrees(self) -> u16 {
        match self {
            Rotation::R0 => 0,
            Rotation::R90 => 90,
            Rotation::R180 => 180,
            Rotation::R270 => 270,
        }
    }

    /// Next orientation, a quarter turn clockwise.
    pub fn next(self) -> Self {
        match self {
            Rotation::R0 => Rotation::R90,
            Rotation::R90 => Rotation::R180,
            Rotation::R180 => Rotation::R270,
            Rotation::R270 => Rotation::R0,
        }
    }

    /// Whether width and depth trade places in this orientation.
    pub fn swaps_axes(self) -> bool {
        matches!(self, Rotation::R90 | Rotation::R270)
    }
}

impl TryFrom<u16> for Rotation {
    type Error = InvalidRotation;

    fn try_from(degrees: u16) -> Result<Self, Self::Error> {
        match degrees {
            0 => Ok(Rotation::R0),
            90 => Ok(Rotation::R90),
            180 => Ok(Rotation::R180),
            270 => Ok(Rotation::R270),
            other => Err(InvalidRotation(other)),
        }
    }
}

impl From<Rotation> for u16 {
    fn from(r: Rotation) -> Self {
        r.degrees()
    }
}

impl PortSide {
    /// Facing of this side after the module is rotated.
    pub fn rotated(self, rotation: Rotation) -> PortSide {
        let mut side = self;
        for _ in 0..rotation.degrees() / 90 {
            side = match side {
                PortSide::North => PortSide::East,
                PortSide::East => PortSide::South,
                PortSide::South => PortSide::West,
                PortSide::West => PortSide::North,
            };
        }
        side
    }
}

/// Axis-aligned rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub depth: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, depth: f64) -> Self {
        Self { x, y, width, depth }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.depth
    }

    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.depth / 2.0)
    }

    /// Overlap with each edge pulled in by `tolerance`, so rectangles that
    /// merely touch (within the tolerance) do not count.
    pub fn overlaps(&self, other: &Rect, tolerance: f64) -> bool {
        let disjoint_x =
            self.right() - tolerance <= other.x || other.right() - tolerance <= self.x;
        let disjoint_y =
            self.bottom() - tolerance <= other.y || other.bottom() - tolerance <= self.y;
        !(disjoint_x || disjoint_y)
    }

    /// Strict intersection with positive area.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.overlaps(other, 0.0)
    }

    /// Point containment, edges inclusive.
    pub fn contains_point(&self, px: f64, py: f64) -> bool {
        px >= self.x && px <= self.right() && py >= self.y && py <= self.bottom()
    }
}

/// Width and depth of a module after rotation.
pub fn rotated_size(width: f64, depth: f64, rotation: Rotation) -> (f64, f64) {
    if rotation.swaps_axes() {
        (depth, width)
    } else {
        (width, depth)
    }
}

/// Rotation-adjusted footprint of a placed main module.
pub fn footprint(module: &PlacedMainModule) -> Rect {
    let (w, d) = rotated_size(
        module.module_type.width,
        module.module_type.depth,
        module.rotation,
    );
    Rect::new(module.x, module.y, w, d)
}

/// Position of a port in canvas coordinates.
///
/// The local offset turns with the module; the rotated footprint keeps its
/// top-left corner at the module's `(x, y)`.
pub fn port_world_position(module: &PlacedMainModule, port: &Port) -> (f64, f64) {
    let w = module.module_type.width;
    let d = module.module_type.depth;
    let (lx, ly) = match module.rotation {
        Rotation::R0 => (port.x, port.y),
        Rotation::R90 => (d - port.y, port.x),
        Rotation::R180 => (w - port.x, d - port.y),
        Rotation::R270 => (port.y, w - port.x),
    };
    (module.x + lx, module.y + ly)
}

/// Round a coordinate to the nearest grid line. A non-positive grid
/// leaves the value untouched.
pub fn snap_to_grid(value: f64, grid: f64) -> f64 {
    if grid <= 0.0 {
        return value;
    }
    (value / grid).round() * grid
}
