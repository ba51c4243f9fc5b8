//! Interfaces of the game subsystems the frame loop drives but does not own
//! the rules of: board, score, timer, sound, tile holder and intro sequence.

use std::{cell::RefCell, rc::Rc, time::Duration};

/// A collaborator shared between the orchestrator and other collaborators.
pub type Shared<T> = Rc<RefCell<T>>;

/// Anything advanced once per frame.
pub trait FrameUpdate {
    fn update(&mut self, dt: Duration) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StarterStatus {
    Running,
    Finished,
}

/// The intro sequence played before the player gets control.
pub trait GameStarter {
    /// Reports `Finished` once the intro is over, and on every call after that.
    fn update(&mut self, dt: Duration) -> anyhow::Result<StarterStatus>;
}

pub trait TileHolder: FrameUpdate {
    fn set_visible(&mut self, visible: bool);
}

pub trait ScoreManager: FrameUpdate {}

pub trait Board: FrameUpdate {
    fn set_tile_holder(&mut self, holder: Shared<dyn TileHolder>);
    fn create_map(&mut self, width: u32, height: u32) -> anyhow::Result<()>;
    fn dispose(&mut self);
}

pub trait GameLogic {
    fn set_tile_holder(&mut self, holder: Shared<dyn TileHolder>);
    fn create_cursor(&mut self) -> anyhow::Result<()>;
    fn enable(&mut self);
    fn dispose_cursor(&mut self);
}

pub trait GameTimer: FrameUpdate {
    fn set_game_logic(&mut self, logic: Shared<dyn GameLogic>);
    fn is_playing(&self) -> bool;
    fn set_playing(&mut self, playing: bool);
}

pub trait SoundManager {
    fn play_sound(&mut self, name: &str) -> anyhow::Result<()>;
}

/// Everything the orchestrator polls or pokes, built by the application.
pub struct Collaborators {
    pub starter: Box<dyn GameStarter>,
    pub tile_holder: Shared<dyn TileHolder>,
    pub score: Box<dyn ScoreManager>,
    pub board: Box<dyn Board>,
    pub game_logic: Shared<dyn GameLogic>,
    pub timer: Box<dyn GameTimer>,
    pub sound: Box<dyn SoundManager>,
}
