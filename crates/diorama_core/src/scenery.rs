//! The animated props: one aircraft circling overhead and three cars
//! driving up and down the edges of the board.

use crate::animation::{round_trip, Phase};
use crate::assets::{AssetPlacementSpec, InstanceSpec};
use glam::Vec3;
use std::time::Duration;

const AIRCRAFT_BASE: &str = "assets/models/aircraft/";
const VEHICLE_BASE: &str = "assets/models/bugatti/";

#[derive(Debug, Clone, PartialEq)]
pub struct AnimatedProp {
    pub label: &'static str,
    pub base: &'static str,
    pub asset: &'static str,
    pub size: f32,
    pub position: Vec3,
    pub destination: Vec3,
    /// Yaw before and after the turn at the far end, in degrees.
    pub turn_degrees: (f32, f32),
    /// Move out, turn, move back, turn back.
    pub durations: [Duration; 4],
}

impl AnimatedProp {
    /// Placed facing the way the cycle starts, so the first turn does not snap.
    pub fn yaw(&self) -> f32 {
        self.turn_degrees.0.to_radians()
    }

    pub fn placement(&self) -> AssetPlacementSpec {
        AssetPlacementSpec::from_base(
            self.base,
            self.asset,
            self.size,
            vec![InstanceSpec::new(self.position, Vec3::new(0.0, self.yaw(), 0.0))],
        )
    }

    pub fn phases(&self) -> [Phase; 4] {
        round_trip(self.position, self.destination, self.turn_degrees, self.durations)
    }
}

fn secs(s: u64) -> Duration {
    Duration::from_secs(s)
}

pub fn aircraft() -> AnimatedProp {
    AnimatedProp {
        label: "aircraft",
        base: AIRCRAFT_BASE,
        asset: "plane",
        size: 15.0,
        position: Vec3::new(5.0, 40.0, 50.0),
        destination: Vec3::new(100.0, 40.0, 50.0),
        turn_degrees: (270.0, 90.0),
        durations: [secs(40), secs(2), secs(30), secs(2)],
    }
}

pub fn vehicles() -> [AnimatedProp; 3] {
    [
        AnimatedProp {
            label: "vehicle-a",
            base: VEHICLE_BASE,
            asset: "bugatti",
            size: 2.0,
            position: Vec3::new(94.0, 0.29, 5.0),
            destination: Vec3::new(-3.0, 0.29, 5.0),
            turn_degrees: (270.0, 90.0),
            durations: [secs(20), secs(1), secs(10), secs(2)],
        },
        AnimatedProp {
            label: "vehicle-b",
            base: VEHICLE_BASE,
            asset: "bugatti",
            size: 2.0,
            position: Vec3::new(-3.0, 0.29, 65.0),
            destination: Vec3::new(94.0, 0.29, 65.0),
            turn_degrees: (-270.0, -90.0),
            durations: [secs(15), secs(2), secs(12), secs(2)],
        },
        AnimatedProp {
            label: "vehicle-c",
            base: VEHICLE_BASE,
            asset: "bugatti",
            size: 1.0,
            position: Vec3::new(45.0, 0.29, -3.5),
            destination: Vec3::new(45.0, 0.29, 94.0),
            turn_degrees: (0.0, 180.0),
            durations: [secs(20), secs(1), secs(20), secs(2)],
        },
    ]
}

/// Aircraft first, then the vehicles.
pub fn animated_props() -> Vec<AnimatedProp> {
    let mut props = vec![aircraft()];
    props.extend(vehicles());
    props
}
