//! Asynchronous loading and placement of decorative assets.
//!
//! Fetching and parsing run on a dedicated loader thread with its own
//! current-thread tokio runtime. Each `load_asset` call becomes an isolated
//! task: the material library is fetched and parsed first, then the geometry
//! (bound against those materials), then the uniform scale is worked out.
//! Finished work crosses back over a channel and is only linked into the
//! scene by [`AssetLoader::apply_completed`], which the frame loop calls
//! between ticks. Entities are therefore complete before they become visible.

pub mod placement;
pub mod source;

pub use placement::{place_instances, uniform_scale, AssetPlacementSpec, InstanceSpec, PreparedAsset};
pub use source::{AssetSource, FsAssetSource, MemoryAssetSource, Progress, ProgressFn, SourceError};

use crate::animation::AnimationEngine;
use crate::scene::{EntityId, Model, Scene};
use crossbeam_channel::{Receiver, Sender};
use std::{
    collections::HashMap,
    sync::Arc,
    thread,
    time::{Duration, Instant},
};
use thiserror::Error;
use tokio::sync::{mpsc, watch};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum LoadError {
    #[error("failed to load materials '{path}': {reason}")]
    Material { path: String, reason: String },
    #[error("failed to load geometry '{path}': {reason}")]
    Geometry { path: String, reason: String },
    #[error("'{path}' has no measurable geometry")]
    EmptyGeometry { path: String },
    #[error("desired size {0} is not a positive number")]
    InvalidSize(f32),
    #[error("asset loader is not running")]
    LoaderUnavailable,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadStatus {
    Pending,
    Placed(Vec<EntityId>),
    Failed(LoadError),
}

impl LoadStatus {
    pub fn is_settled(&self) -> bool {
        !matches!(self, LoadStatus::Pending)
    }
}

/// Outcome of one `load_asset` call, handed to its continuation.
#[derive(Debug, Clone)]
pub struct LoadReport {
    pub asset: String,
    pub result: Result<Vec<EntityId>, LoadError>,
}

impl LoadReport {
    pub fn status(&self) -> LoadStatus {
        match &self.result {
            Ok(ids) => LoadStatus::Placed(ids.clone()),
            Err(e) => LoadStatus::Failed(e.clone()),
        }
    }
}

/// Runs on the frame thread once the asset is placed or has failed.
pub type OnPlaced = Box<dyn FnOnce(&LoadReport, &mut AnimationEngine)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoadId(u64);

/// Observable completion of one load.
#[derive(Debug, Clone)]
pub struct LoadTicket {
    id: LoadId,
    status: watch::Receiver<LoadStatus>,
}

impl LoadTicket {
    pub fn id(&self) -> LoadId {
        self.id
    }

    pub fn status(&self) -> LoadStatus {
        self.status.borrow().clone()
    }

    pub fn is_settled(&self) -> bool {
        self.status.borrow().is_settled()
    }

    /// Resolves once the load is placed or failed. If the loader is dropped
    /// first, resolves with whatever status was last published.
    pub async fn settled(&mut self) -> LoadStatus {
        let settled = match self.status.wait_for(LoadStatus::is_settled).await {
            Ok(status) => Some(status.clone()),
            Err(_) => None,
        };
        settled.unwrap_or_else(|| self.status())
    }
}

struct LoadRequest {
    id: LoadId,
    name: String,
    material_path: String,
    geometry_path: String,
    desired_size: f32,
}

struct Completion {
    id: LoadId,
    result: Result<PreparedAsset, LoadError>,
}

struct PendingLoad {
    spec: AssetPlacementSpec,
    on_placed: Option<OnPlaced>,
    status: watch::Sender<LoadStatus>,
}

pub struct AssetLoader {
    requests: mpsc::UnboundedSender<LoadRequest>,
    completions_tx: Sender<Completion>,
    completions: Receiver<Completion>,
    pending: HashMap<LoadId, PendingLoad>,
    next_id: u64,
}

impl AssetLoader {
    /// Starts the loader thread. If the thread cannot start, every load fails
    /// with [`LoadError::LoaderUnavailable`] instead.
    pub fn spawn(source: Arc<dyn AssetSource>) -> Self {
        let (requests, requests_rx) = mpsc::unbounded_channel();
        let (completions_tx, completions) = crossbeam_channel::unbounded();

        let done = completions_tx.clone();
        if let Err(e) = thread::Builder::new()
            .name("asset-loader".into())
            .spawn(move || run_loader(source, requests_rx, done))
        {
            log::error!("Failed to start asset loader thread: {}", e);
        }

        Self {
            requests,
            completions_tx,
            completions,
            pending: HashMap::new(),
            next_id: 1,
        }
    }

    /// Queues a two-stage load. `on_placed` runs on the frame thread after
    /// the instances are in the scene, or after the failure is logged.
    pub fn load_asset(&mut self, spec: AssetPlacementSpec, on_placed: Option<OnPlaced>) -> LoadTicket {
        let id = LoadId(self.next_id);
        self.next_id += 1;

        let (status_tx, status_rx) = watch::channel(LoadStatus::Pending);

        let request = LoadRequest {
            id,
            name: spec.name.clone(),
            material_path: spec.material_path.clone(),
            geometry_path: spec.geometry_path.clone(),
            desired_size: spec.desired_size,
        };

        log::debug!(
            "Queued '{}' ({} + {}, {} instance(s))",
            spec.name,
            spec.material_path,
            spec.geometry_path,
            spec.instances.len()
        );

        self.pending.insert(
            id,
            PendingLoad {
                spec,
                on_placed,
                status: status_tx,
            },
        );

        if !(request.desired_size > 0.0 && request.desired_size.is_finite()) {
            let size = request.desired_size;
            self.fail_locally(id, LoadError::InvalidSize(size));
        } else if self.requests.send(request).is_err() {
            self.fail_locally(id, LoadError::LoaderUnavailable);
        }

        LoadTicket {
            id,
            status: status_rx,
        }
    }

    /// Failures detected before reaching the loader thread still settle
    /// through the normal completion path.
    fn fail_locally(&self, id: LoadId, error: LoadError) {
        let _ = self.completions_tx.send(Completion {
            id,
            result: Err(error),
        });
    }

    /// Links every finished load into `scene` and runs its continuation.
    /// Never blocks. Returns the number of loads settled.
    pub fn apply_completed(&mut self, scene: &mut Scene, animator: &mut AnimationEngine) -> usize {
        let mut applied = 0;
        while let Ok(completion) = self.completions.try_recv() {
            self.apply(completion, scene, animator);
            applied += 1;
        }
        applied
    }

    /// Like `apply_completed`, but waits up to `timeout` for every pending load.
    pub fn settle(&mut self, scene: &mut Scene, animator: &mut AnimationEngine, timeout: Duration) -> usize {
        let deadline = Instant::now() + timeout;
        let mut applied = 0;

        while !self.pending.is_empty() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            match self.completions.recv_timeout(deadline - now) {
                Ok(completion) => {
                    self.apply(completion, scene, animator);
                    applied += 1;
                }
                Err(_) => break,
            }
        }

        applied
    }

    /// Loads requested but not yet settled.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    fn apply(&mut self, completion: Completion, scene: &mut Scene, animator: &mut AnimationEngine) {
        let Some(PendingLoad {
            spec,
            on_placed,
            status,
        }) = self.pending.remove(&completion.id)
        else {
            log::warn!("Completion for unknown load {:?} ignored", completion.id);
            return;
        };

        let result = match completion.result {
            Ok(prepared) => {
                let ids = place_instances(scene, &prepared, &spec.instances);
                log::info!(
                    "Placed {} instance(s) of '{}' at scale {:.4}",
                    ids.len(),
                    spec.name,
                    prepared.scale
                );
                Ok(ids)
            }
            Err(err) => {
                log::error!("Error loading '{}': {}", spec.name, err);
                Err(err)
            }
        };

        let report = LoadReport {
            asset: spec.name,
            result,
        };

        if let Some(on_placed) = on_placed {
            on_placed(&report, animator);
        }

        status.send_replace(report.status());
    }
}

fn run_loader(
    source: Arc<dyn AssetSource>,
    mut requests: mpsc::UnboundedReceiver<LoadRequest>,
    done: Sender<Completion>,
) {
    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            log::error!("Failed to build asset loader runtime: {}", e);
            return;
        }
    };

    rt.block_on(async move {
        log::info!("Asset loader started");
        while let Some(request) = requests.recv().await {
            let source = source.clone();
            let done = done.clone();
            tokio::spawn(async move {
                let id = request.id;
                let result = prepare(source.as_ref(), request).await;
                // The receiving side only disappears when the loader is dropped.
                let _ = done.send(Completion { id, result });
            });
        }
    });

    log::debug!("Asset loader stopped");
}

fn log_progress(path: &str) -> ProgressFn {
    let path = path.to_owned();
    Arc::new(move |progress: Progress| match progress.percent() {
        Some(percent) => log::debug!("{}: {:.0}% loaded", path, percent),
        None => log::debug!("{}: {} bytes loaded", path, progress.loaded),
    })
}

/// Material stage, then geometry stage, then scale.
async fn prepare(source: &dyn AssetSource, request: LoadRequest) -> Result<PreparedAsset, LoadError> {
    let LoadRequest {
        name,
        material_path,
        geometry_path,
        desired_size,
        ..
    } = request;

    let material_err = |reason: String| LoadError::Material {
        path: material_path.clone(),
        reason,
    };
    let mtl = source
        .fetch(&material_path, log_progress(&material_path))
        .await
        .map_err(|e| material_err(e.to_string()))?;
    let materials = objmtl::parse_mtl(&mtl[..]).map_err(|e| material_err(e.to_string()))?;

    let geometry_err = |reason: String| LoadError::Geometry {
        path: geometry_path.clone(),
        reason,
    };
    let obj = source
        .fetch(&geometry_path, log_progress(&geometry_path))
        .await
        .map_err(|e| geometry_err(e.to_string()))?;
    let geometry = objmtl::parse_obj(&obj[..], &materials).map_err(|e| geometry_err(e.to_string()))?;

    let scale = geometry
        .bounds()
        .and_then(|bounds| uniform_scale(&bounds, desired_size))
        .ok_or_else(|| LoadError::EmptyGeometry {
            path: geometry_path.clone(),
        })?;

    log::debug!(
        "Prepared '{}': {} material(s), {} triangle(s)",
        name,
        materials.len(),
        geometry.triangle_count()
    );

    Ok(PreparedAsset {
        model: Arc::new(Model {
            name,
            materials,
            geometry,
        }),
        scale,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use futures::future::BoxFuture;
    use glam::Vec3;
    use std::cell::Cell;
    use std::rc::Rc;
    use std::sync::Mutex;

    pub(crate) const BOX_MTL: &str = "newmtl paint\nKd 0.9 0.1 0.1\n";

    /// 2 x 4 x 1 box, so the largest dimension is y.
    pub(crate) const BOX_OBJ: &str = "\
mtllib box.mtl
o box
v 0 0 0
v 2 0 0
v 2 4 0
v 0 4 0
v 0 0 1
v 2 4 1
usemtl paint
f 1 2 3 4
f 1 5 6
";

    pub(crate) fn box_source() -> MemoryAssetSource {
        let mut source = MemoryAssetSource::new();
        source
            .insert("props/box.mtl", BOX_MTL)
            .insert("props/box.obj", BOX_OBJ)
            .insert("props/broken.mtl", BOX_MTL)
            .insert("props/broken.obj", "v 0 0 0\nf 1 2 3\n");
        source
    }

    /// Remembers the order in which paths were requested.
    struct CountingSource {
        inner: MemoryAssetSource,
        fetched: Arc<Mutex<Vec<String>>>,
    }

    impl AssetSource for CountingSource {
        fn fetch(&self, path: &str, progress: ProgressFn) -> BoxFuture<'static, Result<bytes::Bytes, SourceError>> {
            self.fetched.lock().unwrap().push(path.to_owned());
            self.inner.fetch(path, progress)
        }
    }

    fn spec(name: &str, size: f32, instances: Vec<InstanceSpec>) -> AssetPlacementSpec {
        AssetPlacementSpec::from_base("props/", name, size, instances)
    }

    fn settle_all(loader: &mut AssetLoader, scene: &mut Scene, animator: &mut AnimationEngine) {
        loader.settle(scene, animator, Duration::from_secs(5));
        assert_eq!(loader.pending(), 0, "loads did not settle in time");
    }

    #[test]
    fn three_instances_become_three_scaled_entities() {
        let mut loader = AssetLoader::spawn(Arc::new(box_source()));
        let mut scene = Scene::default();
        let mut animator = AnimationEngine::new();

        let instances = vec![
            InstanceSpec::new(Vec3::new(1.0, 0.0, 0.0), Vec3::ZERO),
            InstanceSpec::new(Vec3::new(5.0, 0.0, 2.0), Vec3::new(0.0, 1.5, 0.0)),
            InstanceSpec::new(Vec3::new(-3.0, 1.0, 9.0), Vec3::new(0.1, 0.2, 0.3)),
        ];
        let ticket = loader.load_asset(spec("box", 2.0, instances.clone()), None);
        settle_all(&mut loader, &mut scene, &mut animator);

        let LoadStatus::Placed(ids) = ticket.status() else {
            panic!("unexpected status {:?}", ticket.status());
        };
        assert_eq!(ids.len(), 3);
        assert_eq!(scene.len(), 3);

        for (id, instance) in ids.iter().zip(&instances) {
            let entity = scene.get(*id).unwrap();
            assert_eq!(entity.transform.position, instance.position);
            assert_eq!(entity.transform.rotation, instance.rotation);

            let bounds = entity.model.geometry.bounds().unwrap();
            let scaled = bounds.max_extent() * entity.transform.scale.x;
            assert!((scaled - 2.0).abs() < 1e-5, "largest dimension {scaled}");
            assert_eq!(entity.transform.scale, Vec3::splat(entity.transform.scale.x));
        }

        // Clones share one loaded model.
        let first = &scene.get(ids[0]).unwrap().model;
        assert!(ids.iter().all(|id| Arc::ptr_eq(&scene.get(*id).unwrap().model, first)));
        assert_eq!(first.base_color(), [0.9, 0.1, 0.1]);
    }

    #[test]
    fn geometry_failure_adds_nothing_and_does_not_block_other_loads() {
        let mut loader = AssetLoader::spawn(Arc::new(box_source()));
        let mut scene = Scene::default();
        let mut animator = AnimationEngine::new();

        let broken = loader.load_asset(spec("broken", 1.0, vec![InstanceSpec::new(Vec3::ZERO, Vec3::ZERO)]), None);
        let missing = loader.load_asset(spec("absent", 1.0, vec![InstanceSpec::new(Vec3::ZERO, Vec3::ZERO)]), None);
        settle_all(&mut loader, &mut scene, &mut animator);

        assert!(matches!(broken.status(), LoadStatus::Failed(LoadError::Geometry { .. })));
        assert!(matches!(missing.status(), LoadStatus::Failed(LoadError::Material { .. })));
        assert!(scene.is_empty());

        let later = loader.load_asset(spec("box", 1.0, vec![InstanceSpec::new(Vec3::ZERO, Vec3::ZERO)]), None);
        settle_all(&mut loader, &mut scene, &mut animator);
        assert!(matches!(later.status(), LoadStatus::Placed(ref ids) if ids.len() == 1));
        assert_eq!(scene.len(), 1);
    }

    #[test]
    fn geometry_is_not_requested_when_materials_fail() {
        let fetched = Arc::new(Mutex::new(Vec::new()));
        let mut inner = MemoryAssetSource::new();
        inner.insert("props/lonely.obj", BOX_OBJ);
        let mut loader = AssetLoader::spawn(Arc::new(CountingSource {
            inner,
            fetched: fetched.clone(),
        }));
        let mut scene = Scene::default();
        let mut animator = AnimationEngine::new();

        let ticket = loader.load_asset(spec("lonely", 1.0, vec![]), None);
        settle_all(&mut loader, &mut scene, &mut animator);

        assert!(matches!(ticket.status(), LoadStatus::Failed(LoadError::Material { .. })));
        assert_eq!(*fetched.lock().unwrap(), vec!["props/lonely.mtl".to_owned()]);
    }

    #[test]
    fn material_is_fetched_before_geometry() {
        let fetched = Arc::new(Mutex::new(Vec::new()));
        let mut loader = AssetLoader::spawn(Arc::new(CountingSource {
            inner: box_source(),
            fetched: fetched.clone(),
        }));
        let mut scene = Scene::default();
        let mut animator = AnimationEngine::new();

        loader.load_asset(spec("box", 1.0, vec![]), None);
        settle_all(&mut loader, &mut scene, &mut animator);

        assert_eq!(
            *fetched.lock().unwrap(),
            vec!["props/box.mtl".to_owned(), "props/box.obj".to_owned()]
        );
    }

    #[test]
    fn continuation_runs_once_for_success_and_for_failure() {
        let mut loader = AssetLoader::spawn(Arc::new(box_source()));
        let mut scene = Scene::default();
        let mut animator = AnimationEngine::new();

        let calls = Rc::new(Cell::new(0));
        let seen = Rc::new(std::cell::RefCell::new(Vec::new()));

        for name in ["box", "absent"] {
            let calls = calls.clone();
            let seen = seen.clone();
            loader.load_asset(
                spec(name, 1.0, vec![InstanceSpec::new(Vec3::ZERO, Vec3::ZERO)]),
                Some(Box::new(move |report: &LoadReport, _: &mut AnimationEngine| {
                    calls.set(calls.get() + 1);
                    seen.borrow_mut().push((report.asset.clone(), report.result.is_ok()));
                })),
            );
        }
        settle_all(&mut loader, &mut scene, &mut animator);

        assert_eq!(calls.get(), 2);
        let mut seen = seen.borrow().clone();
        seen.sort();
        assert_eq!(seen, vec![("absent".to_owned(), false), ("box".to_owned(), true)]);
    }

    #[test]
    fn invalid_size_fails_without_touching_the_source() {
        let fetched = Arc::new(Mutex::new(Vec::new()));
        let mut loader = AssetLoader::spawn(Arc::new(CountingSource {
            inner: box_source(),
            fetched: fetched.clone(),
        }));
        let mut scene = Scene::default();
        let mut animator = AnimationEngine::new();

        let ticket = loader.load_asset(spec("box", 0.0, vec![]), None);
        assert_eq!(loader.apply_completed(&mut scene, &mut animator), 1);

        assert_eq!(ticket.status(), LoadStatus::Failed(LoadError::InvalidSize(0.0)));
        assert!(fetched.lock().unwrap().is_empty());
    }

    #[test]
    fn ticket_resolves_asynchronously() {
        let mut loader = AssetLoader::spawn(Arc::new(box_source()));
        let mut scene = Scene::default();
        let mut animator = AnimationEngine::new();

        let mut ticket = loader.load_asset(spec("box", 1.0, vec![InstanceSpec::new(Vec3::ZERO, Vec3::ZERO)]), None);
        assert_eq!(ticket.status(), LoadStatus::Pending);
        settle_all(&mut loader, &mut scene, &mut animator);

        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let status = rt.block_on(ticket.settled());
        assert!(matches!(status, LoadStatus::Placed(ref ids) if ids.len() == 1));
    }

    #[test]
    fn ticket_keeps_last_status_when_loader_goes_away() {
        let mut loader = AssetLoader::spawn(Arc::new(box_source()));
        let mut ticket = loader.load_asset(spec("box", 1.0, vec![InstanceSpec::new(Vec3::ZERO, Vec3::ZERO)]), None);
        drop(loader);

        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        assert_eq!(rt.block_on(ticket.settled()), LoadStatus::Pending);
    }

    #[test]
    fn nothing_is_placed_until_completions_are_applied() {
        let mut loader = AssetLoader::spawn(Arc::new(box_source()));
        let mut scene = Scene::default();

        let ticket = loader.load_asset(spec("box", 1.0, vec![InstanceSpec::new(Vec3::ZERO, Vec3::ZERO)]), None);
        std::thread::sleep(Duration::from_millis(200));

        assert!(scene.is_empty());
        assert!(!ticket.is_settled());

        let mut animator = AnimationEngine::new();
        settle_all(&mut loader, &mut scene, &mut animator);
        assert_eq!(scene.len(), 1);
    }
}
