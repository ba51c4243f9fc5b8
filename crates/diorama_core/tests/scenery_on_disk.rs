//! Loads a complete scenery set from a directory tree and runs frames over it.

use diorama_core::{
    assets::{AssetLoader, FsAssetSource, LoadStatus},
    camera::PerspectiveCamera,
    collaborators::*,
    manifest::DecorationManifest,
    particles::ParticleField,
    scene::Scene,
    viewport::{FrameRenderer, SurfaceSize, Viewport},
    Orchestrator,
};
use std::{
    cell::RefCell,
    fs,
    path::{Path, PathBuf},
    rc::Rc,
    sync::Arc,
    time::{Duration, Instant},
};

const MTL: &str = "newmtl body\nKd 0.2 0.3 0.8\n";
const OBJ: &str = "v 0 0 0\nv 4 0 0\nv 4 1 0\nv 0 1 2\nusemtl body\nf 1 2 3\nf 1 3 4\n";

struct Idle;

impl FrameUpdate for Idle {
    fn update(&mut self, _dt: Duration) -> anyhow::Result<()> {
        Ok(())
    }
}

impl TileHolder for Idle {
    fn set_visible(&mut self, _visible: bool) {}
}

impl ScoreManager for Idle {}

impl Board for Idle {
    fn set_tile_holder(&mut self, _holder: Shared<dyn TileHolder>) {}
    fn create_map(&mut self, _width: u32, _height: u32) -> anyhow::Result<()> {
        Ok(())
    }
    fn dispose(&mut self) {}
}

impl GameLogic for Idle {
    fn set_tile_holder(&mut self, _holder: Shared<dyn TileHolder>) {}
    fn create_cursor(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
    fn enable(&mut self) {}
    fn dispose_cursor(&mut self) {}
}

impl GameTimer for Idle {
    fn set_game_logic(&mut self, _logic: Shared<dyn GameLogic>) {}
    fn is_playing(&self) -> bool {
        false
    }
    fn set_playing(&mut self, _playing: bool) {}
}

impl SoundManager for Idle {
    fn play_sound(&mut self, _name: &str) -> anyhow::Result<()> {
        Ok(())
    }
}

impl GameStarter for Idle {
    fn update(&mut self, _dt: Duration) -> anyhow::Result<StarterStatus> {
        Ok(StarterStatus::Running)
    }
}

#[derive(Default)]
struct CountingRenderer {
    frames: usize,
    entities: usize,
}

impl FrameRenderer for CountingRenderer {
    fn resize(&mut self, _size: SurfaceSize) {}

    fn render(&mut self, scene: &Scene, _camera: &PerspectiveCamera) -> anyhow::Result<()> {
        self.frames += 1;
        self.entities = scene.len();
        Ok(())
    }
}

fn idle_collaborators() -> Collaborators {
    Collaborators {
        starter: Box::new(Idle),
        tile_holder: Rc::new(RefCell::new(Idle)),
        score: Box::new(Idle),
        board: Box::new(Idle),
        game_logic: Rc::new(RefCell::new(Idle)),
        timer: Box::new(Idle),
        sound: Box::new(Idle),
    }
}

fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn asset_tree() -> PathBuf {
    let root = std::env::temp_dir().join(format!("diorama-assets-{}", uuid::Uuid::new_v4()));
    for base in ["assets/models/aircraft/plane", "assets/models/bugatti/bugatti", "assets/decorations/tree/pine"] {
        write(&root, &format!("{base}.mtl"), MTL);
        write(&root, &format!("{base}.obj"), OBJ);
    }
    // Materials present, geometry missing.
    write(&root, "assets/decorations/rock/rock.mtl", MTL);
    write(
        &root,
        "assets/decorations/decors.json",
        r#"{ "decors": [
            { "path": "assets/decorations/tree/", "name": "pine", "desize": 3,
              "instance_spec": [
                { "initPosition": [10, 0, 10], "initAngle": [0, 0, 0] },
                { "initPosition": [20, 0, 10], "initAngle": [0, 1, 0] },
                { "initPosition": [30, 0, 10], "initAngle": [0, 2, 0] } ] },
            { "path": "assets/decorations/rock/", "name": "rock", "desize": 1,
              "instance_spec": [ { "initPosition": [0, 0, 0], "initAngle": [0, 0, 0] } ] },
            { "path": "assets/decorations/bush/", "name": "bush", "desize": 1, "instance_spec": [] }
        ] }"#,
    );
    root
}

#[test]
fn scenery_loads_from_disk_and_frames_keep_running() {
    let root = asset_tree();

    let manifest = DecorationManifest::load(&root.join("assets/decorations/decors.json")).unwrap();
    assert_eq!(manifest.placements.len(), 2);
    assert_eq!(manifest.skipped.len(), 1);

    let viewport = Viewport::initialize(SurfaceSize::new(800, 600), 1.0, CountingRenderer::default());
    let loader = AssetLoader::spawn(Arc::new(FsAssetSource::new(&root)));
    let mut orchestrator = Orchestrator::new(viewport, loader, idle_collaborators());

    let tickets = orchestrator.bootstrap(manifest.placements, ParticleField::snow(1_000, Some(3)), |_| {});
    orchestrator.settle_loads(Duration::from_secs(10));
    assert_eq!(orchestrator.pending_loads(), 0);

    // Aircraft, three vehicles, three pines; the rock never appears.
    assert_eq!(orchestrator.scene().len(), 7);
    assert_eq!(orchestrator.animator().len(), 4);
    assert!(matches!(tickets[5].status(), LoadStatus::Failed(_)));

    let pines: Vec<_> = orchestrator
        .scene()
        .entities()
        .iter()
        .filter(|e| e.name == "pine")
        .collect();
    assert_eq!(pines.len(), 3);
    for pine in pines {
        let largest = pine.model.geometry.bounds().unwrap().max_extent() * pine.transform.scale.x;
        assert!((largest - 3.0).abs() < 1e-5);
    }

    let start = Instant::now();
    for i in 0..30u64 {
        orchestrator.tick_at(start + Duration::from_millis(i * 16));
    }
    assert_eq!(orchestrator.viewport().renderer().frames, 30);
    assert_eq!(orchestrator.viewport().renderer().entities, 7);

    fs::remove_dir_all(&root).unwrap();
}
