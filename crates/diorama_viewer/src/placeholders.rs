//! Stand-in game subsystems so the scene can run without the tile game.
//! They keep just enough state to drive the start sequence and the match
//! clock, and log everything else.

use diorama_core::{
    collaborators::*,
    config::Config,
};
use std::{cell::RefCell, rc::Rc, time::Duration};

const INTRO_LENGTH: Duration = Duration::from_secs(3);

/// Finishes after a fixed stretch of frame time.
#[derive(Debug)]
pub struct TimedIntro {
    remaining: Duration,
}

impl TimedIntro {
    pub fn new(length: Duration) -> Self {
        Self { remaining: length }
    }
}

impl GameStarter for TimedIntro {
    fn update(&mut self, dt: Duration) -> anyhow::Result<StarterStatus> {
        self.remaining = self.remaining.saturating_sub(dt);
        Ok(if self.remaining.is_zero() {
            StarterStatus::Finished
        } else {
            StarterStatus::Running
        })
    }
}

#[derive(Debug, Default)]
pub struct QuietTileHolder;

impl FrameUpdate for QuietTileHolder {
    fn update(&mut self, _dt: Duration) -> anyhow::Result<()> {
        Ok(())
    }
}

impl TileHolder for QuietTileHolder {
    fn set_visible(&mut self, visible: bool) {
        log::trace!("tile holder visible: {}", visible);
    }
}

#[derive(Debug, Default)]
pub struct QuietScore;

impl FrameUpdate for QuietScore {
    fn update(&mut self, _dt: Duration) -> anyhow::Result<()> {
        Ok(())
    }
}

impl ScoreManager for QuietScore {}

#[derive(Debug)]
pub struct QuietBoard {
    texture_path: String,
}

impl QuietBoard {
    pub fn new(texture_path: &str) -> Self {
        Self {
            texture_path: texture_path.to_owned(),
        }
    }
}

impl FrameUpdate for QuietBoard {
    fn update(&mut self, _dt: Duration) -> anyhow::Result<()> {
        Ok(())
    }
}

impl Board for QuietBoard {
    fn set_tile_holder(&mut self, _holder: Shared<dyn TileHolder>) {
        log::trace!("board received tile holder");
    }

    fn create_map(&mut self, width: u32, height: u32) -> anyhow::Result<()> {
        if width == 0 || height == 0 {
            anyhow::bail!("map must have at least one tile");
        }
        log::trace!("board map {}x{} (textures from {})", width, height, self.texture_path);
        Ok(())
    }

    fn dispose(&mut self) {
        log::trace!("board disposed");
    }
}

#[derive(Debug, Default)]
pub struct QuietLogic;

impl GameLogic for QuietLogic {
    fn set_tile_holder(&mut self, _holder: Shared<dyn TileHolder>) {
        log::trace!("game logic received tile holder");
    }

    fn create_cursor(&mut self) -> anyhow::Result<()> {
        log::trace!("cursor created");
        Ok(())
    }

    fn enable(&mut self) {
        log::trace!("game logic enabled");
    }

    fn dispose_cursor(&mut self) {
        log::trace!("cursor disposed");
    }
}

/// Counts the match down while playing and stops at zero.
#[derive(Debug)]
pub struct MatchTimer {
    left: Duration,
    playing: bool,
}

impl MatchTimer {
    pub fn new(length: Duration) -> Self {
        Self {
            left: length,
            playing: false,
        }
    }

    pub fn left(&self) -> Duration {
        self.left
    }
}

impl FrameUpdate for MatchTimer {
    fn update(&mut self, dt: Duration) -> anyhow::Result<()> {
        if !self.playing {
            return Ok(());
        }
        self.left = self.left.saturating_sub(dt);
        if self.left.is_zero() {
            self.playing = false;
            log::info!("Time is up");
        }
        Ok(())
    }
}

impl GameTimer for MatchTimer {
    fn set_game_logic(&mut self, _logic: Shared<dyn GameLogic>) {
        log::trace!("timer received game logic");
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn set_playing(&mut self, playing: bool) {
        self.playing = playing;
    }
}

#[derive(Debug, Default)]
pub struct LoggingSound;

impl SoundManager for LoggingSound {
    fn play_sound(&mut self, name: &str) -> anyhow::Result<()> {
        log::info!("Playing sound '{}'", name);
        Ok(())
    }
}

pub fn collaborators(config: &Config) -> Collaborators {
    Collaborators {
        starter: Box::new(TimedIntro::new(INTRO_LENGTH)),
        tile_holder: Rc::new(RefCell::new(QuietTileHolder)),
        score: Box::new(QuietScore),
        board: Box::new(QuietBoard::new(&config.texture_path)),
        game_logic: Rc::new(RefCell::new(QuietLogic)),
        timer: Box::new(MatchTimer::new(Duration::from_secs(config.match_seconds))),
        sound: Box::new(LoggingSound),
    }
}
