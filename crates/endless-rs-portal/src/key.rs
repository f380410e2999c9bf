//! The canonical identity of a physical portal.

use endless_rs_engine::{BlockPos, PortalBlockAxis, Position};
use serde::{Deserialize, Serialize};

/// Horizontal normal of the portal plane. A `Z`-axis portal sits on a fixed
/// z and spans x and y; an `X`-axis portal sits on a fixed x and spans z
/// and y.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortalAxis {
    X,
    Z,
}

impl PortalAxis {
    /// Orientation property for placed portal blocks. The block property
    /// names the axis the opening spans, which is the opposite of the key's
    /// plane normal.
    pub fn block_axis(self) -> PortalBlockAxis {
        match self {
            PortalAxis::Z => PortalBlockAxis::X,
            PortalAxis::X => PortalBlockAxis::Z,
        }
    }
}

/// Normalized (dimension, axis, min, max) identity of a portal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortalKey {
    pub dimension: String,
    pub axis: PortalAxis,
    pub min: BlockPos,
    pub max: BlockPos,
}

impl PortalKey {
    /// Build a key from any two opposite corners; `min <= max` componentwise
    /// afterwards.
    pub fn normalized(dimension: &str, axis: PortalAxis, a: BlockPos, b: BlockPos) -> Self {
        Self {
            dimension: dimension.to_string(),
            axis,
            min: BlockPos::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: BlockPos::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    /// Whether the portal volume contains `pos`.
    pub fn contains(&self, pos: BlockPos) -> bool {
        (self.min.x..=self.max.x).contains(&pos.x)
            && (self.min.y..=self.max.y).contains(&pos.y)
            && (self.min.z..=self.max.z).contains(&pos.z)
    }

    /// Chunk coordinates the portal intersects.
    pub fn chunks(&self) -> Vec<(i32, i32)> {
        let (min_cx, min_cz) = self.min.chunk();
        let (max_cx, max_cz) = self.max.chunk();
        let mut out = Vec::new();
        for cx in min_cx..=max_cx {
            for cz in min_cz..=max_cz {
                out.push((cx, cz));
            }
        }
        out
    }

    /// Center of the portal opening at foot level.
    pub fn center(&self) -> Position {
        Position::new(
            (self.min.x + self.max.x + 1) as f64 / 2.0,
            self.min.y as f64,
            (self.min.z + self.max.z + 1) as f64 / 2.0,
        )
    }

    /// Every block position of the portal volume.
    pub fn positions(&self) -> Vec<BlockPos> {
        let mut out = Vec::new();
        for x in self.min.x..=self.max.x {
            for y in self.min.y..=self.max.y {
                for z in self.min.z..=self.max.z {
                    out.push(BlockPos::new(x, y, z));
                }
            }
        }
        out
    }
}
