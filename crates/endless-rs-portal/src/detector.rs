//! Flood-fill portal detection.

use std::collections::{HashSet, VecDeque};

use endless_rs_engine::{BlockPos, Instance};

use crate::key::{PortalAxis, PortalKey};

/// Worldgen can paint arbitrarily large portal sheets; the tick thread bails
/// out instead of walking them all.
const MAX_PORTAL_BLOCKS: usize = 4096;

/// Detect the portal containing `start`. Returns `None` when `start` is not
/// a portal block.
///
/// A single isolated portal block has no horizontal neighbors to read the
/// axis from and defaults to `Z`.
pub fn detect_portal(instance: &dyn Instance, start: BlockPos) -> Option<PortalKey> {
    let is_portal = |pos: BlockPos| {
        instance
            .block(pos)
            .map(|id| instance.catalog().is_portal(id))
            .unwrap_or(false)
    };

    if !is_portal(start) {
        return None;
    }

    let axis = if is_portal(BlockPos::new(start.x + 1, start.y, start.z))
        || is_portal(BlockPos::new(start.x - 1, start.y, start.z))
    {
        PortalAxis::Z
    } else if is_portal(BlockPos::new(start.x, start.y, start.z + 1))
        || is_portal(BlockPos::new(start.x, start.y, start.z - 1))
    {
        PortalAxis::X
    } else {
        PortalAxis::Z
    };

    // The two horizontal directions of the portal plane, plus up and down.
    let dirs: [(i32, i32, i32); 4] = match axis {
        PortalAxis::Z => [(1, 0, 0), (-1, 0, 0), (0, 1, 0), (0, -1, 0)],
        PortalAxis::X => [(0, 0, 1), (0, 0, -1), (0, 1, 0), (0, -1, 0)],
    };

    let mut visited = HashSet::new();
    let mut queue = VecDeque::new();
    visited.insert(start);
    queue.push_back(start);

    let mut min = start;
    let mut max = start;
    while let Some(pos) = queue.pop_front() {
        min = BlockPos::new(min.x.min(pos.x), min.y.min(pos.y), min.z.min(pos.z));
        max = BlockPos::new(max.x.max(pos.x), max.y.max(pos.y), max.z.max(pos.z));
        if visited.len() >= MAX_PORTAL_BLOCKS {
            break;
        }
        for (dx, dy, dz) in dirs {
            let next = BlockPos::new(pos.x + dx, pos.y + dy, pos.z + dz);
            if is_portal(next) && visited.insert(next) {
                queue.push_back(next);
            }
        }
    }

    Some(PortalKey::normalized(
        instance.dimension_id(),
        axis,
        min,
        max,
    ))
}

/// Whether every block of the key's volume is still a portal block.
pub fn portal_exists(instance: &dyn Instance, key: &PortalKey) -> bool {
    key.positions().iter().all(|pos| {
        instance
            .block(*pos)
            .map(|id| instance.catalog().is_portal(id))
            .unwrap_or(false)
    })
}
