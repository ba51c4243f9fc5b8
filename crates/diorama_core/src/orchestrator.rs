//! The per-frame driver.
//!
//! One [`Orchestrator::tick`] is one display refresh. Within a tick the order
//! is fixed: finished asset loads are linked into the scene, animation cycles
//! advance, then the game starter, tile holder, score manager, board and game
//! timer update, then the orbit controls, then the snow, and finally the
//! frame is rendered. A failing collaborator is logged and the tick carries on.

use crate::animation::AnimationEngine;
use crate::assets::{AssetLoader, AssetPlacementSpec, LoadReport, LoadTicket};
use crate::collaborators::{Collaborators, StarterStatus};
use crate::frame::FrameClock;
use crate::particles::ParticleField;
use crate::scene::Scene;
use crate::scenery::{self, AnimatedProp};
use crate::viewport::{FrameRenderer, Viewport, ViewportEvent};
use anyhow::Context;
use std::time::{Duration, Instant};

pub struct Orchestrator<R> {
    viewport: Viewport<R>,
    scene: Scene,
    animator: AnimationEngine,
    loader: AssetLoader,
    clock: FrameClock,
    collaborators: Collaborators,
    game_started: bool,
    frames: u64,
}

impl<R: FrameRenderer> Orchestrator<R> {
    /// Takes ownership of every component and wires the collaborators
    /// together. The tile holder starts hidden.
    pub fn new(viewport: Viewport<R>, loader: AssetLoader, mut collaborators: Collaborators) -> Self {
        let holder = collaborators.tile_holder.clone();
        collaborators.game_logic.borrow_mut().set_tile_holder(holder.clone());
        collaborators.board.set_tile_holder(holder.clone());
        holder.borrow_mut().set_visible(false);
        collaborators
            .timer
            .set_game_logic(collaborators.game_logic.clone());

        Self {
            viewport,
            scene: Scene::with_default_lighting(),
            animator: AnimationEngine::new(),
            loader,
            clock: FrameClock::new(),
            collaborators,
            game_started: false,
            frames: 0,
        }
    }

    /// Queues the aircraft, the vehicles and every decoration, installs the
    /// snow field, then hands control to `on_ready`. Loads finish in the
    /// background and appear during later ticks.
    pub fn bootstrap<F>(
        &mut self,
        decorations: Vec<AssetPlacementSpec>,
        snow: ParticleField,
        on_ready: F,
    ) -> Vec<LoadTicket>
    where
        F: FnOnce(&mut Self),
    {
        let mut tickets = Vec::with_capacity(4 + decorations.len());

        for prop in scenery::animated_props() {
            tickets.push(self.load_animated(prop));
        }
        for decoration in decorations {
            tickets.push(self.loader.load_asset(decoration, None));
        }

        log::info!("Snow field with {} particles", snow.len());
        self.scene.particles = Some(snow);

        on_ready(self);
        tickets
    }

    fn load_animated(&mut self, prop: AnimatedProp) -> LoadTicket {
        let phases = prop.phases();
        let label = prop.label;
        self.loader.load_asset(
            prop.placement(),
            Some(Box::new(move |report: &LoadReport, animator: &mut AnimationEngine| {
                let Ok(ids) = &report.result else {
                    return;
                };
                for id in ids {
                    if let Err(e) = animator.start_cycle(*id, phases) {
                        log::error!("Cannot animate {}: {}", label, e);
                    }
                }
            })),
        )
    }

    pub fn tick(&mut self) {
        self.tick_at(Instant::now());
    }

    /// One frame, timed as if it started at `now`.
    pub fn tick_at(&mut self, now: Instant) {
        let dt = self.clock.delta_at(now);

        self.pump_loads();
        self.animator.advance(dt, &mut self.scene);

        self.update_starter(dt);
        self.update_tile_holder(dt);
        log_failure("score manager", self.collaborators.score.update(dt));
        log_failure("board", self.collaborators.board.update(dt));
        log_failure("game timer", self.collaborators.timer.update(dt));

        self.viewport.update_controls();
        if let Some(snow) = self.scene.particles.as_mut() {
            snow.advance();
        }

        log_failure("renderer", self.viewport.render(&self.scene));
        self.frames += 1;
    }

    /// Links finished loads into the scene without waiting.
    pub fn pump_loads(&mut self) -> usize {
        self.loader.apply_completed(&mut self.scene, &mut self.animator)
    }

    /// Blocks until every queued load settles or `timeout` passes.
    pub fn settle_loads(&mut self, timeout: Duration) -> usize {
        self.loader.settle(&mut self.scene, &mut self.animator, timeout)
    }

    fn update_starter(&mut self, dt: Duration) {
        match self.collaborators.starter.update(dt) {
            Ok(StarterStatus::Finished) if !self.game_started => self.start_game(),
            Ok(_) => {}
            Err(e) => log::error!("game starter update failed: {:#}", e),
        }
    }

    fn update_tile_holder(&mut self, dt: Duration) {
        match self.collaborators.tile_holder.try_borrow_mut() {
            Ok(mut holder) => log_failure("tile holder", holder.update(dt)),
            Err(_) => log::error!("tile holder is borrowed elsewhere; update skipped"),
        }
    }

    /// Hands control to the player once the intro is over.
    fn start_game(&mut self) {
        self.game_started = true;

        self.viewport.enable_navigation();
        match self.collaborators.tile_holder.try_borrow_mut() {
            Ok(mut holder) => holder.set_visible(true),
            Err(_) => log::error!("tile holder is borrowed elsewhere; cannot show it"),
        }
        self.collaborators.timer.set_playing(true);
        log_failure("sound manager", self.collaborators.sound.play_sound("BGM"));

        match self.collaborators.game_logic.try_borrow_mut() {
            Ok(mut logic) => {
                log_failure("game logic", logic.create_cursor());
                logic.enable();
            }
            Err(_) => log::error!("game logic is borrowed elsewhere; cursor not created"),
        }

        log::info!("Game started after {} frames", self.frames);
    }

    /// Throws away the current board and cursor, then builds a fresh map.
    pub fn create_game(&mut self, width: u32, height: u32) -> anyhow::Result<()> {
        self.dispose();
        self.collaborators
            .board
            .create_map(width, height)
            .with_context(|| format!("Failed to create {width}x{height} map"))?;
        log::info!("Created {}x{} map", width, height);
        Ok(())
    }

    pub fn dispose(&mut self) {
        self.collaborators.board.dispose();
        match self.collaborators.game_logic.try_borrow_mut() {
            Ok(mut logic) => logic.dispose_cursor(),
            Err(_) => log::error!("game logic is borrowed elsewhere; cursor not disposed"),
        }
    }

    pub fn handle_event(&mut self, event: ViewportEvent) {
        self.viewport.handle_event(event);
    }

    pub fn viewport(&self) -> &Viewport<R> {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut Viewport<R> {
        &mut self.viewport
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn animator(&self) -> &AnimationEngine {
        &self.animator
    }

    pub fn pending_loads(&self) -> usize {
        self.loader.pending()
    }

    pub fn game_started(&self) -> bool {
        self.game_started
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

fn log_failure(what: &str, result: anyhow::Result<()>) {
    if let Err(e) = result {
        log::error!("{} failed: {:#}", what, e);
    }
}
