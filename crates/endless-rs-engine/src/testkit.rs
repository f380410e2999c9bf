//! In-memory engine implementations for tests.
//!
//! A hash-map world, a manually pumped scheduler, and recording player/item
//! stand-ins. Enabled via the `testkit` feature so downstream crates can use
//! them from their own test modules.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use uuid::Uuid;

use crate::{
    BlockCatalog, BlockId, BlockPos, EngineError, Instance, ItemEntity, Player,
    PortalBlockAxis, Position, TickScheduler,
};

// ─── Blocks ──────────────────────────────────────────────────────────────────

pub const AIR: BlockId = BlockId(0);
pub const STONE: BlockId = BlockId(1);
pub const OBSIDIAN: BlockId = BlockId(2);
pub const PORTAL_AXIS_X: BlockId = BlockId(3);
pub const PORTAL_AXIS_Z: BlockId = BlockId(4);

/// Fixed five-block catalog.
#[derive(Debug, Default)]
pub struct TestCatalog;

impl BlockCatalog for TestCatalog {
    fn air(&self) -> BlockId {
        AIR
    }
    fn frame(&self) -> BlockId {
        OBSIDIAN
    }
    fn portal(&self, axis: PortalBlockAxis) -> BlockId {
        match axis {
            PortalBlockAxis::X => PORTAL_AXIS_X,
            PortalBlockAxis::Z => PORTAL_AXIS_Z,
        }
    }
    fn is_portal(&self, id: BlockId) -> bool {
        id == PORTAL_AXIS_X || id == PORTAL_AXIS_Z
    }
    fn is_solid(&self, id: BlockId) -> bool {
        id == STONE || id == OBSIDIAN
    }
}

// ─── World ───────────────────────────────────────────────────────────────────

/// Sparse in-memory world; unset positions read as air.
pub struct GridWorld {
    dimension_id: String,
    base_world: bool,
    min_y: i32,
    max_y: i32,
    blocks: Mutex<HashMap<BlockPos, BlockId>>,
    loaded_chunks: Mutex<HashSet<(i32, i32)>>,
    catalog: TestCatalog,
}

impl GridWorld {
    pub fn new(dimension_id: &str, min_y: i32, max_y: i32) -> Arc<Self> {
        Arc::new(Self {
            dimension_id: dimension_id.to_string(),
            base_world: false,
            min_y,
            max_y,
            blocks: Mutex::new(HashMap::new()),
            loaded_chunks: Mutex::new(HashSet::new()),
            catalog: TestCatalog,
        })
    }

    /// A world flagged as a vanilla base world.
    pub fn base(dimension_id: &str, min_y: i32, max_y: i32) -> Arc<Self> {
        Arc::new(Self {
            dimension_id: dimension_id.to_string(),
            base_world: true,
            min_y,
            max_y,
            blocks: Mutex::new(HashMap::new()),
            loaded_chunks: Mutex::new(HashSet::new()),
            catalog: TestCatalog,
        })
    }

    /// Fill an inclusive box with one block id.
    pub fn fill(&self, min: BlockPos, max: BlockPos, id: BlockId) {
        let mut blocks = self.blocks.lock().unwrap();
        for x in min.x..=max.x {
            for y in min.y..=max.y {
                for z in min.z..=max.z {
                    blocks.insert(BlockPos::new(x, y, z), id);
                }
            }
        }
    }

    /// Chunks that have been requested via `load_chunk`.
    pub fn requested_chunks(&self) -> Vec<(i32, i32)> {
        let mut chunks: Vec<_> = self.loaded_chunks.lock().unwrap().iter().copied().collect();
        chunks.sort();
        chunks
    }

    pub fn block_at(&self, x: i32, y: i32, z: i32) -> BlockId {
        self.block(BlockPos::new(x, y, z)).unwrap_or(AIR)
    }
}

impl Instance for GridWorld {
    fn dimension_id(&self) -> &str {
        &self.dimension_id
    }
    fn is_base_world(&self) -> bool {
        self.base_world
    }
    fn min_y(&self) -> i32 {
        self.min_y
    }
    fn max_y(&self) -> i32 {
        self.max_y
    }
    fn block(&self, pos: BlockPos) -> Option<BlockId> {
        Some(*self.blocks.lock().unwrap().get(&pos).unwrap_or(&AIR))
    }
    fn set_block(&self, pos: BlockPos, id: BlockId) {
        self.blocks.lock().unwrap().insert(pos, id);
    }
    fn load_chunk(&self, cx: i32, cz: i32) {
        self.loaded_chunks.lock().unwrap().insert((cx, cz));
    }
    fn catalog(&self) -> &dyn BlockCatalog {
        &self.catalog
    }
}

// ─── Scheduler ───────────────────────────────────────────────────────────────

/// Next-tick scheduler pumped by hand from tests.
#[derive(Default)]
pub struct ManualScheduler {
    queue: Mutex<VecDeque<Box<dyn FnOnce() + Send>>>,
}

impl ManualScheduler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Run everything queued before this call. Tasks scheduled while running
    /// wait for the next tick, matching the engine's semantics.
    pub fn tick(&self) -> usize {
        let batch: Vec<_> = {
            let mut queue = self.queue.lock().unwrap();
            queue.drain(..).collect()
        };
        let count = batch.len();
        for task in batch {
            task();
        }
        count
    }

    /// Tick until the queue stays empty, bounded by `max_ticks`.
    pub fn run_until_idle(&self, max_ticks: usize) -> usize {
        let mut ran = 0;
        for _ in 0..max_ticks {
            let count = self.tick();
            if count == 0 {
                break;
            }
            ran += count;
        }
        ran
    }

    pub fn pending(&self) -> usize {
        self.queue.lock().unwrap().len()
    }
}

impl TickScheduler for ManualScheduler {
    fn run_next_tick(&self, task: Box<dyn FnOnce() + Send + 'static>) {
        self.queue.lock().unwrap().push_back(task);
    }
}

// ─── Player & items ──────────────────────────────────────────────────────────

/// Player stand-in that records every instance change.
pub struct TestPlayer {
    uuid: Uuid,
    position: Mutex<Position>,
    moves: Mutex<Vec<(String, Position)>>,
}

impl TestPlayer {
    pub fn new(position: Position) -> Arc<Self> {
        Arc::new(Self {
            uuid: Uuid::new_v4(),
            position: Mutex::new(position),
            moves: Mutex::new(Vec::new()),
        })
    }

    pub fn set_position(&self, position: Position) {
        *self.position.lock().unwrap() = position;
    }

    /// Recorded `(dimension id, position)` pairs, oldest first.
    pub fn moves(&self) -> Vec<(String, Position)> {
        self.moves.lock().unwrap().clone()
    }
}

impl Player for TestPlayer {
    fn uuid(&self) -> Uuid {
        self.uuid
    }
    fn position(&self) -> Position {
        *self.position.lock().unwrap()
    }
    fn set_instance(
        &self,
        instance: Arc<dyn Instance>,
        position: Position,
    ) -> Result<(), EngineError> {
        *self.position.lock().unwrap() = position;
        self.moves
            .lock()
            .unwrap()
            .push((instance.dimension_id().to_string(), position));
        Ok(())
    }
}

/// A dropped book with fixed text.
pub struct TestBook {
    uuid: Uuid,
    position: Position,
    text: Option<String>,
    consumed: AtomicBool,
}

impl TestBook {
    pub fn new(position: Position, text: &str) -> Arc<Self> {
        Arc::new(Self {
            uuid: Uuid::new_v4(),
            position,
            text: Some(text.to_string()),
            consumed: AtomicBool::new(false),
        })
    }

    pub fn consumed(&self) -> bool {
        self.consumed.load(Ordering::SeqCst)
    }
}

impl ItemEntity for TestBook {
    fn uuid(&self) -> Uuid {
        self.uuid
    }
    fn position(&self) -> Position {
        self.position
    }
    fn book_text(&self) -> Option<String> {
        self.text.clone()
    }
    fn consume(&self) {
        self.consumed.store(true, Ordering::SeqCst);
    }
}
