use serde::{Deserialize, Serialize};

use super::{Size, Vec2};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BuildingId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildingKind {
    House,
    Shop,
    Park,
    Office,
    Square,
    Fountain,
    Water,
}

impl BuildingKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BuildingKind::House => "house",
            BuildingKind::Shop => "shop",
            BuildingKind::Park => "park",
            BuildingKind::Office => "office",
            BuildingKind::Square => "square",
            BuildingKind::Fountain => "fountain",
            BuildingKind::Water => "water",
        }
    }

    /// Flat ground features are painted with the terrain, under every
    /// depth-sorted entity.
    pub fn is_ground_level(self) -> bool {
        matches!(
            self,
            BuildingKind::Square | BuildingKind::Park | BuildingKind::Water
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildingState {
    #[default]
    Normal,
    Burning,
    Festive,
    Damaged,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Building {
    pub id: BuildingId,
    pub name: String,
    pub kind: BuildingKind,
    /// Top-left corner.
    pub position: Vec2,
    pub size: Size,
    pub state: BuildingState,
    pub owner_name: Option<String>,
}

impl Building {
    pub fn center(&self) -> Vec2 {
        Vec2::new(
            self.position.x + self.size.w * 0.5,
            self.position.y + self.size.h * 0.5,
        )
    }

    pub fn footprint_bottom(&self) -> f32 {
        self.position.y + self.size.h
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropKind {
    Pine,
    Banyan,
    Willow,
    Sakura,
    Coconut,
    Mango,
    Jackfruit,
    Bush,
    Grass,
    FlowerRed,
    FlowerBlue,
    FlowerYellow,
}

impl PropKind {
    pub const ALL: [PropKind; 12] = [
        PropKind::Pine,
        PropKind::Banyan,
        PropKind::Willow,
        PropKind::Sakura,
        PropKind::Coconut,
        PropKind::Mango,
        PropKind::Jackfruit,
        PropKind::Bush,
        PropKind::Grass,
        PropKind::FlowerRed,
        PropKind::FlowerBlue,
        PropKind::FlowerYellow,
    ];

    pub fn is_tree(self) -> bool {
        !matches!(
            self,
            PropKind::Bush
                | PropKind::Grass
                | PropKind::FlowerRed
                | PropKind::FlowerBlue
                | PropKind::FlowerYellow
        )
    }
}

/// Decoration placed at load time and never touched again.
#[derive(Debug, Clone, PartialEq)]
pub struct Prop {
    pub position: Vec2,
    pub kind: PropKind,
    pub name: Option<String>,
}
