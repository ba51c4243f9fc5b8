use crate::{placeholders, renderer::GpuRenderer};
use anyhow::Result;
use diorama_core::{
    assets::{AssetLoader, FsAssetSource},
    config::Config,
    manifest::DecorationManifest,
    particles::ParticleField,
    viewport::{SurfaceSize, Viewport, ViewportEvent},
    Orchestrator,
};
use std::sync::Arc;
use winit::{
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
    window::Window,
};

/// Turns raw window input into viewport events; drags need the left button held.
#[derive(Debug, Default)]
pub struct PointerTracker {
    dragging: bool,
    last: Option<(f64, f64)>,
}

impl PointerTracker {
    pub fn translate(&mut self, event: &WindowEvent) -> Option<ViewportEvent> {
        match event {
            WindowEvent::Resized(size) => Some(ViewportEvent::Resized(SurfaceSize::new(size.width, size.height))),
            WindowEvent::MouseInput {
                button: MouseButton::Left,
                state,
                ..
            } => {
                self.button(*state == ElementState::Pressed);
                None
            }
            WindowEvent::CursorMoved { position, .. } => self.moved(position.x, position.y),
            WindowEvent::MouseWheel { delta, .. } => {
                let steps = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 120.0,
                };
                Some(ViewportEvent::Wheel(steps))
            }
            _ => None,
        }
    }

    pub fn button(&mut self, pressed: bool) {
        self.dragging = pressed;
    }

    pub fn moved(&mut self, x: f64, y: f64) -> Option<ViewportEvent> {
        let last = self.last.replace((x, y))?;
        if !self.dragging {
            return None;
        }
        Some(ViewportEvent::Drag {
            dx: (x - last.0) as f32,
            dy: (y - last.1) as f32,
        })
    }
}

pub struct App {
    pub orchestrator: Orchestrator<GpuRenderer>,
    pointer: PointerTracker,
}

impl App {
    pub async fn new(window: Arc<Window>, config: &Config) -> Result<Self> {
        let size = window.inner_size();
        let renderer = GpuRenderer::new(window.clone()).await?;
        let viewport = Viewport::initialize(
            SurfaceSize::new(size.width, size.height),
            window.scale_factor(),
            renderer,
        );

        let loader = AssetLoader::spawn(Arc::new(FsAssetSource::new(&config.asset_root)));
        let mut orchestrator = Orchestrator::new(viewport, loader, placeholders::collaborators(config));

        let manifest_path = config.manifest_path();
        let decorations = match DecorationManifest::load(&manifest_path) {
            Ok(manifest) => manifest.placements,
            Err(e) => {
                log::error!("No decorations from {}: {}", manifest_path.display(), e);
                Vec::new()
            }
        };

        let snow = ParticleField::snow(config.snow_particles, config.seed);
        let (width, height) = (config.board_width, config.board_height);
        orchestrator.bootstrap(decorations, snow, |o| {
            if let Err(e) = o.create_game(width, height) {
                log::error!("{:#}", e);
            }
        });

        Ok(Self {
            orchestrator,
            pointer: PointerTracker::default(),
        })
    }

    pub fn handle_event(&mut self, event: &WindowEvent) {
        if let Some(event) = self.pointer.translate(event) {
            self.orchestrator.handle_event(event);
        }
    }

    pub fn frame(&mut self) {
        self.orchestrator.tick();
    }
}
