//! Dimension instance lifecycle: single-flight pack builds on a dedicated
//! worker thread, on-tick instance attachment, and the instance cache.

use std::collections::HashMap;
use std::sync::{mpsc, Arc, Mutex};
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use endless_rs_dimension::{
    BiomeSlot, DimensionDefinition, DimensionDefinitionService, PaletteDefinition, ShellType,
};
use endless_rs_engine::{EngineError, Instance, TickScheduler};
use endless_rs_pack::{load_pack, ConfigPack, PackMaterializer};

use crate::error::DimensionServiceError;

/// Creates engine instances from built packs. Implemented by the host; called
/// on the tick thread only.
pub trait InstanceHost: Send + Sync {
    fn create_instance(
        &self,
        definition: &DimensionDefinition,
        pack: &ConfigPack,
    ) -> Result<Arc<dyn Instance>, EngineError>;
}

pub type InstanceResult = Result<Arc<dyn Instance>, DimensionServiceError>;

/// Completion handle for a requested instance.
pub type InstanceFuture = oneshot::Receiver<InstanceResult>;

/// Completion callback for the request_* variants.
pub type InstanceCallback = Box<dyn FnOnce(InstanceResult) + Send>;
type Job = Box<dyn FnOnce() + Send>;

enum BuildInputs {
    Text {
        text: String,
        shell: ShellType,
        biomes: Vec<BiomeSlot>,
        palettes: std::collections::BTreeMap<u32, PaletteDefinition>,
    },
    ById,
}

struct ServiceState {
    cached: HashMap<String, Arc<dyn Instance>>,
    inflight: HashMap<String, Vec<InstanceCallback>>,
    shutdown: bool,
}

struct BuilderHandle {
    tx: mpsc::Sender<Job>,
    done_rx: mpsc::Receiver<()>,
}

/// Resolves texts and ids to live instances, building packs at most once per
/// dimension id.
pub struct DimensionService {
    definitions: Arc<DimensionDefinitionService>,
    materializer: Arc<PackMaterializer>,
    host: Arc<dyn InstanceHost>,
    scheduler: Arc<dyn TickScheduler>,
    state: Mutex<ServiceState>,
    builder: Mutex<Option<BuilderHandle>>,
}

impl DimensionService {
    pub fn new(
        definitions: Arc<DimensionDefinitionService>,
        materializer: Arc<PackMaterializer>,
        host: Arc<dyn InstanceHost>,
        scheduler: Arc<dyn TickScheduler>,
    ) -> Arc<Self> {
        let (tx, rx) = mpsc::channel::<Job>();
        let (done_tx, done_rx) = mpsc::channel::<()>();
        std::thread::Builder::new()
            .name("endless-pack-builder".into())
            .spawn(move || {
                while let Ok(job) = rx.recv() {
                    job();
                }
                let _ = done_tx.send(());
            })
            .expect("failed to spawn pack-builder thread");

        Arc::new(Self {
            definitions,
            materializer,
            host,
            scheduler,
            state: Mutex::new(ServiceState {
                cached: HashMap::new(),
                inflight: HashMap::new(),
                shutdown: false,
            }),
            builder: Mutex::new(Some(BuilderHandle { tx, done_rx })),
        })
    }

    pub fn definitions(&self) -> &Arc<DimensionDefinitionService> {
        &self.definitions
    }

    /// Resolve `text` to an instance, creating definition, pack, and
    /// instance as needed.
    pub fn create_or_resolve_instance(
        self: &Arc<Self>,
        text: &str,
        shell: ShellType,
        biomes: Vec<BiomeSlot>,
        palettes: std::collections::BTreeMap<u32, PaletteDefinition>,
    ) -> InstanceFuture {
        let (tx, rx) = oneshot::channel();
        self.request_instance(
            text,
            shell,
            biomes,
            palettes,
            Box::new(move |result| {
                let _ = tx.send(result);
            }),
        );
        rx
    }

    /// Like [`Self::create_or_resolve_instance`], for an already-registered
    /// id. Unknown ids fail the future.
    pub fn create_or_resolve_instance_by_id(self: &Arc<Self>, dimension_id: &str) -> InstanceFuture {
        let (tx, rx) = oneshot::channel();
        self.request_instance_by_id(
            dimension_id,
            Box::new(move |result| {
                let _ = tx.send(result);
            }),
        );
        rx
    }

    /// Callback variant used by tick-thread callers: the callback runs on the
    /// tick thread for successful builds (and cached hits on the caller
    /// thread), or wherever the failure surfaced.
    pub fn request_instance(
        self: &Arc<Self>,
        text: &str,
        shell: ShellType,
        biomes: Vec<BiomeSlot>,
        palettes: std::collections::BTreeMap<u32, PaletteDefinition>,
        callback: InstanceCallback,
    ) {
        let resolved = self.definitions.resolve(text);
        self.request(
            resolved.dimension_id,
            BuildInputs::Text {
                text: text.to_string(),
                shell,
                biomes,
                palettes,
            },
            callback,
        );
    }

    pub fn request_instance_by_id(self: &Arc<Self>, dimension_id: &str, callback: InstanceCallback) {
        if self.definitions.get(dimension_id).is_none() {
            callback(Err(DimensionServiceError::UnknownDefinition(
                dimension_id.to_string(),
            )));
            return;
        }
        self.request(dimension_id.to_string(), BuildInputs::ById, callback);
    }

    /// A cached instance, if one is live.
    pub fn cached(&self, dimension_id: &str) -> Option<Arc<dyn Instance>> {
        self.state.lock().unwrap().cached.get(dimension_id).cloned()
    }

    fn request(self: &Arc<Self>, dimension_id: String, inputs: BuildInputs, callback: InstanceCallback) {
        {
            let mut state = self.state.lock().unwrap();
            if state.shutdown {
                drop(state);
                callback(Err(DimensionServiceError::Cancelled));
                return;
            }
            if let Some(instance) = state.cached.get(&dimension_id) {
                let instance = instance.clone();
                drop(state);
                callback(Ok(instance));
                return;
            }
            if let Some(waiters) = state.inflight.get_mut(&dimension_id) {
                waiters.push(callback);
                return;
            }
            state.inflight.insert(dimension_id.clone(), vec![callback]);
        }

        let service = self.clone();
        let id = dimension_id.clone();
        let submitted = self.submit(Box::new(move || service.build(id, inputs)));
        if !submitted {
            self.complete(&dimension_id, Err(DimensionServiceError::Cancelled));
        }
    }

    /// Runs on the pack-builder thread: definition + pack, then hand off to
    /// the tick thread for the attach step.
    fn build(self: Arc<Self>, dimension_id: String, inputs: BuildInputs) {
        debug!("Building pack for {dimension_id}");
        let built: Result<(Arc<DimensionDefinition>, ConfigPack), DimensionServiceError> = (|| {
            let definition = match inputs {
                BuildInputs::ById => self.definitions.get(&dimension_id).ok_or_else(|| {
                    DimensionServiceError::UnknownDefinition(dimension_id.clone())
                })?,
                BuildInputs::Text {
                    text,
                    shell,
                    biomes,
                    palettes,
                } => self
                    .definitions
                    .resolve_or_create(&text, shell, biomes, palettes)
                    .map_err(|e| DimensionServiceError::Build(e.to_string()))?,
            };
            let dir = self
                .materializer
                .create_pack(&definition)
                .map_err(|e| DimensionServiceError::Build(e.to_string()))?;
            let pack = load_pack(&dir).map_err(|e| DimensionServiceError::Build(e.to_string()))?;
            Ok((definition, pack))
        })();

        match built {
            Err(e) => {
                warn!("Pack build for {dimension_id} failed: {e}");
                self.complete(&dimension_id, Err(e));
            }
            Ok((definition, pack)) => {
                let service = self.clone();
                self.scheduler.run_next_tick(Box::new(move || {
                    service.attach(dimension_id, &definition, &pack);
                }));
            }
        }
    }

    /// Runs on the tick thread: create the instance, publish it, complete
    /// the waiters.
    fn attach(self: &Arc<Self>, dimension_id: String, definition: &DimensionDefinition, pack: &ConfigPack) {
        if self.state.lock().unwrap().shutdown {
            debug!("Discarding instance for {dimension_id}: service shut down");
            return;
        }
        match self.host.create_instance(definition, pack) {
            Ok(instance) => {
                self.state
                    .lock()
                    .unwrap()
                    .cached
                    .insert(dimension_id.clone(), instance.clone());
                info!("Instance attached for {dimension_id}");
                self.complete(&dimension_id, Ok(instance));
            }
            Err(e) => {
                warn!("Instance attach for {dimension_id} failed: {e}");
                self.complete(
                    &dimension_id,
                    Err(DimensionServiceError::Engine(e.to_string())),
                );
            }
        }
    }

    /// Remove the inflight entry and notify every waiter. Completion always
    /// clears its own entry, success or not.
    fn complete(&self, dimension_id: &str, result: InstanceResult) {
        let waiters = self
            .state
            .lock()
            .unwrap()
            .inflight
            .remove(dimension_id)
            .unwrap_or_default();
        for waiter in waiters {
            waiter(result.clone());
        }
    }

    fn submit(&self, job: Job) -> bool {
        match &*self.builder.lock().unwrap() {
            Some(handle) => handle.tx.send(job).is_ok(),
            None => false,
        }
    }

    /// Stop accepting work, cancel pending waiters, and give the builder a
    /// bounded grace period to drain. A build still running after the grace
    /// is abandoned; its late result is discarded by `attach`.
    pub fn shutdown(&self, grace: Duration) {
        let drained: Vec<(String, Vec<InstanceCallback>)> = {
            let mut state = self.state.lock().unwrap();
            state.shutdown = true;
            state.inflight.drain().collect()
        };
        for (_, waiters) in drained {
            for waiter in waiters {
                waiter(Err(DimensionServiceError::Cancelled));
            }
        }

        if let Some(handle) = self.builder.lock().unwrap().take() {
            drop(handle.tx);
            match handle.done_rx.recv_timeout(grace) {
                Ok(()) => info!("Pack builder drained"),
                Err(_) => warn!("Pack builder did not stop within {grace:?}; abandoning"),
            }
        }
    }
}
