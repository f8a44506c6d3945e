mod agent;
mod building;
mod world;

use std::ops::{Add, Mul, Sub};

pub use agent::{
    Accessory, Agent, AgentId, AgentIdParseError, AgentTraits, AnimationState, Emotion,
    EmotionParseError, EyeType, MouthType, ShirtStyle,
};
pub use building::{Building, BuildingId, BuildingKind, BuildingState, Prop, PropKind};
pub use world::{CubicSegment, Rect, RiverPath, VillageWorld, Weather, WorldLayout, WorldState};

/// World-space point. +x right, +y down, one unit per pixel at zoom 1.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn distance_to(self, other: Vec2) -> f32 {
        (other - self).length()
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Size {
    pub w: f32,
    pub h: f32,
}
