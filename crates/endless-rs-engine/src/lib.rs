//! Engine boundary: the traits the core consumes from the voxel engine.
//!
//! This crate defines the interface the host engine implements. It has no
//! dependency on the dimension model or the pack pipeline, so engine adapters
//! can be written against it in isolation.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub mod base_worlds;
#[cfg(feature = "testkit")]
pub mod testkit;

pub use base_worlds::BaseWorldRegistry;

/// Instance tag carrying the dimension id.
pub const TAG_DIMENSION_ID: &str = "endless:dimension_id";

/// Instance tag flagging a vanilla base world.
pub const TAG_BASE_WORLD: &str = "endless:base_world";

// ─── Types ───────────────────────────────────────────────────────────────────

/// Integer block position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Chunk coordinates containing this position.
    pub fn chunk(self) -> (i32, i32) {
        (self.x.div_euclid(16), self.z.div_euclid(16))
    }
}

/// Entity position with view angles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub yaw: f32,
    pub pitch: f32,
}

impl Position {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            x,
            y,
            z,
            yaw: 0.0,
            pitch: 0.0,
        }
    }

    pub fn with_look(x: f64, y: f64, z: f64, yaw: f32, pitch: f32) -> Self {
        Self { x, y, z, yaw, pitch }
    }

    /// Block containing this position.
    pub fn block(self) -> BlockPos {
        BlockPos::new(
            self.x.floor() as i32,
            self.y.floor() as i32,
            self.z.floor() as i32,
        )
    }
}

/// Engine-side block runtime id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId(pub u32);

/// Orientation property stamped on placed portal blocks. Names the block-face
/// normal, which is perpendicular to the axis the portal spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortalBlockAxis {
    X,
    Z,
}

// ─── Errors ──────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("instance attach failed: {0}")]
    Attach(String),

    #[error("teleport failed: {0}")]
    Teleport(String),

    #[error("chunk ({cx}, {cz}) failed to load: {reason}")]
    ChunkLoad { cx: i32, cz: i32, reason: String },
}

// ─── Traits ──────────────────────────────────────────────────────────────────

/// Classifies the block ids the core cares about and names the ones it
/// places. The engine's block registry backs this.
pub trait BlockCatalog: Send + Sync {
    fn air(&self) -> BlockId;

    /// Block used for portal frames (obsidian).
    fn frame(&self) -> BlockId;

    /// Portal block with the given orientation property.
    fn portal(&self, axis: PortalBlockAxis) -> BlockId;

    fn is_portal(&self, id: BlockId) -> bool;

    fn is_solid(&self, id: BlockId) -> bool;

    fn is_air(&self, id: BlockId) -> bool {
        id == self.air()
    }
}

/// A loaded world the core can read and mutate. All methods are tick-thread
/// only, matching the engine's threading rules.
pub trait Instance: Send + Sync {
    /// Value of the `endless:dimension_id` tag.
    fn dimension_id(&self) -> &str;

    /// Whether the `endless:base_world` tag is set.
    fn is_base_world(&self) -> bool {
        false
    }

    fn min_y(&self) -> i32;

    fn max_y(&self) -> i32;

    /// Block at `pos`, or `None` when the chunk is not loaded.
    fn block(&self, pos: BlockPos) -> Option<BlockId>;

    fn set_block(&self, pos: BlockPos, id: BlockId);

    /// Request a chunk load; completion is observed on a later tick.
    fn load_chunk(&self, cx: i32, cz: i32);

    fn catalog(&self) -> &dyn BlockCatalog;
}

impl std::fmt::Debug for dyn Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance")
            .field("dimension_id", &self.dimension_id())
            .finish()
    }
}

/// A connected player.
pub trait Player: Send + Sync {
    fn uuid(&self) -> Uuid;

    fn position(&self) -> Position;

    /// Move the player into `instance` at `position`.
    fn set_instance(
        &self,
        instance: Arc<dyn Instance>,
        position: Position,
    ) -> Result<(), EngineError>;
}

/// A dropped item stack, pre-filtered by the host to book items. The core
/// consumes already-extracted text; NBT parsing stays at the boundary.
pub trait ItemEntity: Send + Sync {
    fn uuid(&self) -> Uuid;

    fn position(&self) -> Position;

    /// Concatenated page text, falling back to the title for written books.
    /// `None` when the stack is not a book or the text is blank.
    fn book_text(&self) -> Option<String>;

    /// Remove the item entity from the world.
    fn consume(&self);
}

/// Hands a task to the engine's next-tick scheduler. Tasks run on the tick
/// thread in submission order.
pub trait TickScheduler: Send + Sync {
    fn run_next_tick(&self, task: Box<dyn FnOnce() + Send + 'static>);
}
