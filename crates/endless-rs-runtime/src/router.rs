//! Portal routing: player traversal, book-triggered dimension creation, and
//! portal invalidation, driven by the engine's tick and block events.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};
use uuid::Uuid;

use endless_rs_dimension::DimensionDefinitionService;
use endless_rs_engine::{
    base_worlds, BaseWorldRegistry, BlockPos, Instance, ItemEntity, Player, Position,
    TickScheduler,
};
use endless_rs_keys::KeyKind;
use endless_rs_portal::{
    detect_portal, portal_exists, DestinationRef, LinkType, PortalAxis, PortalIndex, PortalKey,
    PortalLink, PortalRegistry,
};

use crate::derive::{derive_definition_inputs, shell_for_seed};
use crate::service::{DimensionService, InstanceCallback, InstanceResult};
use crate::teleport::teleport_exact;

/// Ids minted by this system share one namespace.
const ENDLESS_PREFIX: &str = "endlessdimensions:";

/// Tuning knobs for the router, filled from the runtime config.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    pub cooldown: Duration,
    pub book_radius: f64,
    pub allow_reuse: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            cooldown: Duration::from_secs(3),
            book_radius: 6.0,
            allow_reuse: true,
        }
    }
}

type PortalReady = Box<dyn FnOnce(PortalKey) + Send>;

/// Event-driven orchestration of portal traversal.
pub struct PortalRouter {
    service: Arc<DimensionService>,
    definitions: Arc<DimensionDefinitionService>,
    registry: Arc<PortalRegistry>,
    index: Arc<PortalIndex>,
    base_worlds: Arc<BaseWorldRegistry>,
    scheduler: Arc<dyn TickScheduler>,
    config: RouterConfig,
    cooldowns: Mutex<HashMap<Uuid, Instant>>,
    processed_items: Mutex<HashSet<Uuid>>,
}

impl PortalRouter {
    /// Build a router and prime the portal index from the registry.
    pub fn new(
        service: Arc<DimensionService>,
        registry: Arc<PortalRegistry>,
        base_worlds: Arc<BaseWorldRegistry>,
        scheduler: Arc<dyn TickScheduler>,
        config: RouterConfig,
    ) -> Arc<Self> {
        let definitions = service.definitions().clone();
        let index = Arc::new(PortalIndex::new());
        index.rebuild(registry.keys());
        Arc::new(Self {
            service,
            definitions,
            registry,
            index,
            base_worlds,
            scheduler,
            config,
            cooldowns: Mutex::new(HashMap::new()),
            processed_items: Mutex::new(HashSet::new()),
        })
    }

    pub fn index(&self) -> &Arc<PortalIndex> {
        &self.index
    }

    pub fn registry(&self) -> &Arc<PortalRegistry> {
        &self.registry
    }

    // ─── Player ticks ────────────────────────────────────────────────────────

    /// Per-player tick handler. Detects the portal the player stands in and
    /// routes them through it.
    pub fn on_player_tick(self: &Arc<Self>, instance: &Arc<dyn Instance>, player: &Arc<dyn Player>) {
        let uuid = player.uuid();
        if self.in_cooldown(uuid) {
            return;
        }
        let Some(key) = detect_portal(&**instance, player.position().block()) else {
            return;
        };
        self.index.insert(&key);

        // Stamp the cooldown as soon as routing starts; the chunk-load hops
        // take ticks during which the player is still inside the portal.
        self.touch_cooldown(uuid);

        let link = self
            .registry
            .link(&key)
            .or_else(|| self.upgrade_legacy(&key));
        match link {
            Some(link) => self.route_linked(player, key, link),
            None => self.route_default(player, key),
        }
        self.registry.persist_if_dirty();
    }

    /// Forget per-entity state when an entity despawns.
    pub fn on_entity_despawn(&self, uuid: Uuid) {
        self.cooldowns.lock().unwrap().remove(&uuid);
        self.processed_items.lock().unwrap().remove(&uuid);
    }

    /// Convert a pre-versioning single-column record into a proper link for
    /// the portal the player just used.
    fn upgrade_legacy(&self, key: &PortalKey) -> Option<PortalLink> {
        let legacy = self
            .registry
            .take_legacy(&key.dimension, key.min.x, key.min.z)?;
        let center = key.center();
        let link = PortalLink {
            kind: LinkType::BookLinked,
            link_id: Uuid::new_v4(),
            destination: DestinationRef {
                dimension: legacy.to_dimension.clone(),
                x: center.x,
                y: center.y,
                z: center.z,
                yaw: 0.0,
                pitch: 0.0,
                portal: None,
            },
        };
        self.registry.set_link(key.clone(), link.clone());
        self.registry.persist_if_dirty();
        info!(
            "Upgraded legacy portal record at ({}, {}) in {} → {}",
            key.min.x, key.min.z, key.dimension, legacy.to_dimension
        );
        Some(link)
    }

    /// Route through an existing link: materialize the destination, make
    /// sure its portal stands, teleport, and back-write the portal onto the
    /// link when it was not recorded yet.
    fn route_linked(self: &Arc<Self>, player: &Arc<dyn Player>, source_key: PortalKey, link: PortalLink) {
        let router = self.clone();
        let player = player.clone();
        let destination = link.destination.clone();
        let dest_dimension = destination.dimension.clone();
        self.resolve_destination_instance(
            &dest_dimension,
            Box::new(move |result: InstanceResult| match result {
                Ok(instance) => {
                    let preferred =
                        Position::new(destination.x, destination.y, destination.z);
                    let axis = destination
                        .portal
                        .as_ref()
                        .map(|p| p.axis)
                        .unwrap_or(source_key.axis);
                    let arrive_router = router.clone();
                    let arrive_instance = instance.clone();
                    router.ensure_destination_portal(
                        instance,
                        axis,
                        preferred,
                        destination.portal.clone(),
                        true,
                        Box::new(move |dest_portal| {
                            arrive_router.arrive(
                                arrive_instance,
                                player,
                                source_key,
                                link,
                                dest_portal,
                            );
                        }),
                    );
                }
                Err(e) => warn!("Linked route to {} failed: {e}", destination.dimension),
            }),
        );
    }

    /// Tick-thread arrival: teleport to the destination portal and back-write
    /// it onto the source link when missing.
    fn arrive(
        self: &Arc<Self>,
        instance: Arc<dyn Instance>,
        player: Arc<dyn Player>,
        source_key: PortalKey,
        link: PortalLink,
        dest_portal: PortalKey,
    ) {
        let center = dest_portal.center();
        let target = Position::with_look(
            center.x,
            center.y,
            center.z,
            link.destination.yaw,
            link.destination.pitch,
        );
        teleport_exact(&self.scheduler, instance, player, target);

        if link.destination.portal.is_none() {
            let mut updated = link;
            updated.destination.portal = Some(dest_portal);
            self.registry.set_link(source_key, updated);
            self.registry.persist_if_dirty();
        }
    }

    /// Unlinked portals route vanilla-style: overworld → nether, everything
    /// else → overworld.
    fn route_default(self: &Arc<Self>, player: &Arc<dyn Player>, source_key: PortalKey) {
        let target_dim = if source_key.dimension == base_worlds::OVERWORLD {
            base_worlds::NETHER
        } else {
            base_worlds::OVERWORLD
        };
        let Some(instance) = self.base_worlds.get(target_dim) else {
            warn!("No base world registered for {target_dim}; cannot route");
            return;
        };
        let center = source_key.center();
        let preferred = Position::new(center.x, center.y, center.z);
        let router = self.clone();
        let player = player.clone();
        let teleport_instance = instance.clone();
        self.ensure_destination_portal(
            instance,
            source_key.axis,
            preferred,
            None,
            self.config.allow_reuse,
            Box::new(move |dest_portal| {
                let center = dest_portal.center();
                teleport_exact(
                    &router.scheduler,
                    teleport_instance,
                    player,
                    Position::new(center.x, center.y, center.z),
                );
            }),
        );
    }

    // ─── Book items ──────────────────────────────────────────────────────────

    /// Item-entity tick handler for dropped books. Resolves the text, builds
    /// the dimension, and records a bidirectional link pair.
    pub fn on_book_item_tick(
        self: &Arc<Self>,
        instance: &Arc<dyn Instance>,
        item: &Arc<dyn ItemEntity>,
        players: &[Arc<dyn Player>],
    ) {
        let item_uuid = item.uuid();
        if self.processed_items.lock().unwrap().contains(&item_uuid) {
            return;
        }
        let Some(text) = item.book_text().filter(|t| !t.trim().is_empty()) else {
            return;
        };
        let item_pos = item.position();
        let Some(source_key) = detect_portal(&**instance, item_pos.block()) else {
            return;
        };
        if !self.player_nearby(players, item_pos) {
            return;
        }

        self.processed_items.lock().unwrap().insert(item_uuid);
        item.consume();
        self.index.insert(&source_key);
        info!("Book {:?} thrown into portal in {}", text, source_key.dimension);

        let resolved = self.definitions.resolve(&text);
        let router = self.clone();
        let source = source_key.clone();
        let callback: InstanceCallback = Box::new(move |result| match result {
            Ok(dest_instance) => router.link_book_portals(dest_instance, source),
            Err(e) => warn!("Book dimension build failed: {e}"),
        });

        match resolved.kind {
            KeyKind::Custom => {
                self.service
                    .request_instance_by_id(&resolved.dimension_id, callback);
            }
            KeyKind::EasterEgg | KeyKind::Generated => {
                let shell = shell_for_seed(resolved.seed);
                match derive_definition_inputs(shell, resolved.seed) {
                    Ok((biomes, palettes)) => {
                        self.service
                            .request_instance(&text, shell, biomes, palettes, callback);
                    }
                    Err(e) => warn!("Biome derivation for {:?} failed: {e}", text),
                }
            }
        }
    }

    /// Create the destination portal and both directions of the link pair.
    fn link_book_portals(self: &Arc<Self>, dest_instance: Arc<dyn Instance>, source_key: PortalKey) {
        let center = source_key.center();
        let preferred = Position::new(center.x, center.y, center.z);
        let link_id = Uuid::new_v4();
        let router = self.clone();
        let dest_dim = dest_instance.dimension_id().to_string();
        self.ensure_destination_portal(
            dest_instance,
            source_key.axis,
            preferred,
            None,
            false,
            Box::new(move |dest_portal| {
                let dest_center = dest_portal.center();
                let source_center = source_key.center();
                let forward = PortalLink {
                    kind: LinkType::BookLinked,
                    link_id,
                    destination: DestinationRef {
                        dimension: dest_dim.clone(),
                        x: dest_center.x,
                        y: dest_center.y,
                        z: dest_center.z,
                        yaw: 0.0,
                        pitch: 0.0,
                        portal: Some(dest_portal.clone()),
                    },
                };
                let reverse = PortalLink {
                    kind: LinkType::BookLinked,
                    link_id,
                    destination: DestinationRef {
                        dimension: source_key.dimension.clone(),
                        x: source_center.x,
                        y: source_center.y,
                        z: source_center.z,
                        yaw: 0.0,
                        pitch: 0.0,
                        portal: Some(source_key.clone()),
                    },
                };
                router.registry.set_link(source_key, forward);
                router.registry.set_link(dest_portal, reverse);
                router.registry.persist_if_dirty();
                info!("Book link {link_id} established into {dest_dim}");
            }),
        );
    }

    // ─── Block updates ───────────────────────────────────────────────────────

    /// Block-update handler: re-index portals that grew, drop bindings for
    /// portals that dissolved.
    pub fn on_block_update(&self, instance: &Arc<dyn Instance>, pos: BlockPos) {
        let is_portal_block = instance
            .block(pos)
            .map(|id| instance.catalog().is_portal(id))
            .unwrap_or(false);
        if is_portal_block {
            if let Some(key) = detect_portal(&**instance, pos) {
                self.index.insert(&key);
            }
            return;
        }

        let dimension = instance.dimension_id();
        let containing = self.index.find_containing(dimension, pos).or_else(|| {
            self.registry
                .keys()
                .into_iter()
                .filter(|k| k.dimension == dimension)
                .find(|k| k.contains(pos))
        });
        let Some(key) = containing else {
            return;
        };
        if !portal_exists(&**instance, &key) {
            self.registry.remove_link(&key);
            self.index.remove(&key);
            self.registry.persist_if_dirty();
            info!(
                "Portal at ({}, {}, {}) in {} dissolved; binding removed",
                key.min.x, key.min.y, key.min.z, key.dimension
            );
        }
    }

    // ─── Destination portals ─────────────────────────────────────────────────

    /// Make sure a portal stands at the destination, creating or rebuilding
    /// one as needed, then hand its key to `done` on a later tick.
    fn ensure_destination_portal(
        self: &Arc<Self>,
        instance: Arc<dyn Instance>,
        axis: PortalAxis,
        preferred: Position,
        preferred_portal: Option<PortalKey>,
        allow_reuse: bool,
        done: PortalReady,
    ) {
        if let Some(portal) = preferred_portal {
            for (cx, cz) in portal.chunks() {
                instance.load_chunk(cx, cz);
            }
            let router = self.clone();
            self.scheduler.run_next_tick(Box::new(move || {
                if !portal_exists(&*instance, &portal) {
                    router.rebuild_portal(&*instance, &portal);
                    info!(
                        "Rebuilt missing portal at ({}, {}, {}) in {}",
                        portal.min.x, portal.min.y, portal.min.z, portal.dimension
                    );
                }
                router.index.insert(&portal);
                done(portal);
            }));
            return;
        }

        let (ccx, ccz) = preferred.block().chunk();
        for dx in -1..=1 {
            for dz in -1..=1 {
                instance.load_chunk(ccx + dx, ccz + dz);
            }
        }
        let router = self.clone();
        self.scheduler.run_next_tick(Box::new(move || {
            if allow_reuse {
                if let Some(found) = router.find_reusable(&instance, ccx, ccz) {
                    debug!(
                        "Reusing portal at ({}, {}, {}) in {}",
                        found.min.x, found.min.y, found.min.z, found.dimension
                    );
                    router.index.insert(&found);
                    done(found);
                    return;
                }
            }
            let key = router.create_portal(&*instance, axis, preferred);
            router.index.insert(&key);
            done(key);
        }));
    }

    /// A nearby portal whose link is unset or DEFAULT: first from the index,
    /// then by scanning the loaded chunks.
    fn find_reusable(
        &self,
        instance: &Arc<dyn Instance>,
        ccx: i32,
        ccz: i32,
    ) -> Option<PortalKey> {
        let dimension = instance.dimension_id();
        for dx in -1..=1 {
            for dz in -1..=1 {
                for key in self.index.in_chunk(dimension, ccx + dx, ccz + dz) {
                    if self.is_reusable(&key) && portal_exists(&**instance, &key) {
                        return Some(key);
                    }
                }
            }
        }

        let catalog = instance.catalog();
        for dx in -1..=1 {
            for dz in -1..=1 {
                let base_x = (ccx + dx) * 16;
                let base_z = (ccz + dz) * 16;
                for y in instance.min_y()..instance.max_y() {
                    for lx in 0..16 {
                        for lz in 0..16 {
                            let pos = BlockPos::new(base_x + lx, y, base_z + lz);
                            let portal_here = instance
                                .block(pos)
                                .map(|id| catalog.is_portal(id))
                                .unwrap_or(false);
                            if !portal_here {
                                continue;
                            }
                            if let Some(key) = detect_portal(&**instance, pos) {
                                if self.is_reusable(&key) {
                                    return Some(key);
                                }
                            }
                        }
                    }
                }
            }
        }
        None
    }

    fn is_reusable(&self, key: &PortalKey) -> bool {
        match self.registry.link(key) {
            None => true,
            Some(link) => link.kind == LinkType::Default,
        }
    }

    /// Place a fresh 2×3 portal with an obsidian frame, centered on the
    /// preferred position.
    fn create_portal(
        &self,
        instance: &dyn Instance,
        axis: PortalAxis,
        preferred: Position,
    ) -> PortalKey {
        let catalog = instance.catalog();
        let frame = catalog.frame();
        let portal_block = catalog.portal(axis.block_axis());
        let base = preferred.block();
        let y = base.y.clamp(instance.min_y() + 2, instance.max_y() - 4);

        let (interior_min, interior_max) = match axis {
            PortalAxis::Z => {
                let x0 = base.x - 1;
                let z = base.z;
                for dx in -1..=2 {
                    instance.set_block(BlockPos::new(x0 + dx, y - 1, z), frame);
                    instance.set_block(BlockPos::new(x0 + dx, y + 3, z), frame);
                }
                for dy in 0..=2 {
                    instance.set_block(BlockPos::new(x0 - 1, y + dy, z), frame);
                    instance.set_block(BlockPos::new(x0 + 2, y + dy, z), frame);
                }
                for dx in 0..=1 {
                    for dy in 0..=2 {
                        instance.set_block(BlockPos::new(x0 + dx, y + dy, z), portal_block);
                    }
                }
                (BlockPos::new(x0, y, z), BlockPos::new(x0 + 1, y + 2, z))
            }
            PortalAxis::X => {
                let z0 = base.z - 1;
                let x = base.x;
                for dz in -1..=2 {
                    instance.set_block(BlockPos::new(x, y - 1, z0 + dz), frame);
                    instance.set_block(BlockPos::new(x, y + 3, z0 + dz), frame);
                }
                for dy in 0..=2 {
                    instance.set_block(BlockPos::new(x, y + dy, z0 - 1), frame);
                    instance.set_block(BlockPos::new(x, y + dy, z0 + 2), frame);
                }
                for dz in 0..=1 {
                    for dy in 0..=2 {
                        instance.set_block(BlockPos::new(x, y + dy, z0 + dz), portal_block);
                    }
                }
                (BlockPos::new(x, y, z0), BlockPos::new(x, y + 2, z0 + 1))
            }
        };

        PortalKey::normalized(instance.dimension_id(), axis, interior_min, interior_max)
    }

    /// Re-place frame and interior for a stored key whose blocks vanished.
    fn rebuild_portal(&self, instance: &dyn Instance, key: &PortalKey) {
        let catalog = instance.catalog();
        let frame = catalog.frame();
        let portal_block = catalog.portal(key.axis.block_axis());

        for pos in key.positions() {
            instance.set_block(pos, portal_block);
        }
        match key.axis {
            PortalAxis::Z => {
                let z = key.min.z;
                for x in key.min.x - 1..=key.max.x + 1 {
                    instance.set_block(BlockPos::new(x, key.min.y - 1, z), frame);
                    instance.set_block(BlockPos::new(x, key.max.y + 1, z), frame);
                }
                for y in key.min.y..=key.max.y {
                    instance.set_block(BlockPos::new(key.min.x - 1, y, z), frame);
                    instance.set_block(BlockPos::new(key.max.x + 1, y, z), frame);
                }
            }
            PortalAxis::X => {
                let x = key.min.x;
                for z in key.min.z - 1..=key.max.z + 1 {
                    instance.set_block(BlockPos::new(x, key.min.y - 1, z), frame);
                    instance.set_block(BlockPos::new(x, key.max.y + 1, z), frame);
                }
                for y in key.min.y..=key.max.y {
                    instance.set_block(BlockPos::new(x, y, key.min.z - 1), frame);
                    instance.set_block(BlockPos::new(x, y, key.max.z + 1), frame);
                }
            }
        }
    }

    // ─── Small helpers ───────────────────────────────────────────────────────

    fn resolve_destination_instance(self: &Arc<Self>, dimension_id: &str, callback: InstanceCallback) {
        if dimension_id.starts_with(ENDLESS_PREFIX) {
            self.service.request_instance_by_id(dimension_id, callback);
        } else {
            match self.base_worlds.get(dimension_id) {
                Some(instance) => callback(Ok(instance)),
                None => callback(Err(crate::error::DimensionServiceError::Engine(format!(
                    "no base world registered for {dimension_id}"
                )))),
            }
        }
    }

    fn player_nearby(&self, players: &[Arc<dyn Player>], pos: Position) -> bool {
        players.iter().any(|player| {
            let p = player.position();
            let dx = p.x - pos.x;
            let dy = p.y - pos.y;
            let dz = p.z - pos.z;
            (dx * dx + dy * dy + dz * dz).sqrt() <= self.config.book_radius
        })
    }

    fn in_cooldown(&self, uuid: Uuid) -> bool {
        self.cooldowns
            .lock()
            .unwrap()
            .get(&uuid)
            .map(|since| since.elapsed() < self.config.cooldown)
            .unwrap_or(false)
    }

    fn touch_cooldown(&self, uuid: Uuid) {
        self.cooldowns.lock().unwrap().insert(uuid, Instant::now());
    }
}
