//! Teleport helpers: two next-tick hops with an optional safe-spawn search.

use std::sync::Arc;

use tracing::warn;

use endless_rs_engine::{BlockPos, Instance, Player, Position, TickScheduler};

/// Move a player into an instance, adjusting the target to a safe spawn.
pub fn teleport(
    scheduler: &Arc<dyn TickScheduler>,
    instance: Arc<dyn Instance>,
    player: Arc<dyn Player>,
    position: Position,
) {
    schedule_hops(scheduler, instance, player, position, true);
}

/// Move a player to the exact position, skipping the safe-spawn search.
pub fn teleport_exact(
    scheduler: &Arc<dyn TickScheduler>,
    instance: Arc<dyn Instance>,
    player: Arc<dyn Player>,
    position: Position,
) {
    schedule_hops(scheduler, instance, player, position, false);
}

/// First hop loads the destination chunk, the second performs the move once
/// the chunk has had a tick to arrive.
fn schedule_hops(
    scheduler: &Arc<dyn TickScheduler>,
    instance: Arc<dyn Instance>,
    player: Arc<dyn Player>,
    position: Position,
    safe: bool,
) {
    let scheduler_inner = scheduler.clone();
    scheduler.run_next_tick(Box::new(move || {
        let (cx, cz) = position.block().chunk();
        instance.load_chunk(cx, cz);
        scheduler_inner.run_next_tick(Box::new(move || {
            let target = if safe {
                safe_position(&*instance, position)
            } else {
                position
            };
            if let Err(e) = player.set_instance(instance, target) {
                warn!("Teleport failed: {e}");
            }
        }));
    }));
}

/// Scan downward from the clamped target height for a solid floor with two
/// air blocks above it; fall back to the clamped height when nothing fits.
pub fn safe_position(instance: &dyn Instance, position: Position) -> Position {
    let catalog = instance.catalog();
    let min_y = instance.min_y();
    let max_y = instance.max_y();
    let bx = position.x.floor() as i32;
    let bz = position.z.floor() as i32;
    let clamped = (position.y.floor() as i32).clamp(min_y + 1, max_y - 1);

    for y in (min_y + 1..=clamped).rev() {
        let floor = instance.block(BlockPos::new(bx, y - 1, bz));
        let body = instance.block(BlockPos::new(bx, y, bz));
        let head = instance.block(BlockPos::new(bx, y + 1, bz));
        let solid_floor = floor.map(|id| catalog.is_solid(id)).unwrap_or(false);
        let clear_body = body.map(|id| catalog.is_air(id)).unwrap_or(false);
        let clear_head = head.map(|id| catalog.is_air(id)).unwrap_or(false);
        if solid_floor && clear_body && clear_head {
            return Position {
                y: y as f64,
                ..position
            };
        }
    }
    Position {
        y: clamped as f64,
        ..position
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use endless_rs_engine::testkit::{GridWorld, ManualScheduler, TestPlayer, STONE};

    #[test]
    fn safe_position_finds_floor_below_target() {
        let world = GridWorld::new("endlessdimensions:generated_1", -64, 320);
        world.fill(BlockPos::new(8, 63, 8), BlockPos::new(8, 63, 8), STONE);

        let target = Position::new(8.5, 100.0, 8.5);
        let safe = safe_position(&*world, target);
        assert_eq!(safe.y, 64.0);
        assert_eq!(safe.x, 8.5);
    }

    #[test]
    fn safe_position_skips_buried_targets() {
        let world = GridWorld::new("endlessdimensions:generated_1", -64, 320);
        // Solid column with a pocket at y=70/71 above a floor at y=69.
        world.fill(BlockPos::new(8, 60, 8), BlockPos::new(8, 69, 8), STONE);

        let safe = safe_position(&*world, Position::new(8.5, 80.0, 8.5));
        assert_eq!(safe.y, 70.0);
    }

    #[test]
    fn safe_position_falls_back_to_clamped_height() {
        let world = GridWorld::new("endlessdimensions:generated_1", -64, 320);
        // No floor anywhere.
        let safe = safe_position(&*world, Position::new(0.5, 1000.0, 0.5));
        assert_eq!(safe.y, 319.0);

        let low = safe_position(&*world, Position::new(0.5, -1000.0, 0.5));
        assert_eq!(low.y, -63.0);
    }

    #[test]
    fn teleport_sequences_two_hops() {
        let world = GridWorld::new("endlessdimensions:easter_sky", -64, 320);
        world.fill(BlockPos::new(4, 63, 4), BlockPos::new(4, 63, 4), STONE);
        let scheduler = ManualScheduler::new();
        let scheduler_dyn: Arc<dyn TickScheduler> = scheduler.clone();
        let player = TestPlayer::new(Position::new(0.5, 64.0, 0.5));

        teleport(
            &scheduler_dyn,
            world.clone(),
            player.clone(),
            Position::new(4.5, 90.0, 4.5),
        );

        // Nothing happens until the first tick, which loads the chunk.
        assert!(player.moves().is_empty());
        scheduler.tick();
        assert_eq!(world.requested_chunks(), vec![(0, 0)]);
        assert!(player.moves().is_empty());

        // Second tick performs the move, snapped onto the floor.
        scheduler.tick();
        let moves = player.moves();
        assert_eq!(moves.len(), 1);
        assert_eq!(moves[0].0, "endlessdimensions:easter_sky");
        assert_eq!(moves[0].1.y, 64.0);
    }

    #[test]
    fn teleport_exact_keeps_the_position() {
        let world = GridWorld::new("endlessdimensions:easter_sky", -64, 320);
        let scheduler = ManualScheduler::new();
        let scheduler_dyn: Arc<dyn TickScheduler> = scheduler.clone();
        let player = TestPlayer::new(Position::new(0.5, 64.0, 0.5));

        teleport_exact(
            &scheduler_dyn,
            world,
            player.clone(),
            Position::with_look(4.5, 90.0, 4.5, 180.0, -10.0),
        );
        scheduler.run_until_idle(5);

        let moves = player.moves();
        assert_eq!(moves.len(), 1);
        assert_eq!(moves[0].1.y, 90.0);
        assert_eq!(moves[0].1.yaw, 180.0);
        assert_eq!(moves[0].1.pitch, -10.0);
    }
}
