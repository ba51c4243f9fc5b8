// src/lib.rs
//! Run-time core of the diorama tile game.
//!
//! Owns the per-frame orchestration loop, the asynchronous loader that places
//! decorative props into the shared scene, the looping four-phase animation
//! cycles of the ambient vehicles, and the falling-snow particle field. Board,
//! score, sound, timer and tile holder logic live behind the traits in
//! [`collaborators`].

pub mod animation;
pub mod assets;
pub mod camera;
pub mod collaborators;
pub mod config;
pub mod frame;
pub mod manifest;
pub mod orchestrator;
pub mod particles;
pub mod scene;
pub mod scenery;
pub mod viewport;

pub use orchestrator::Orchestrator;
