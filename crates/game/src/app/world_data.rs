use std::collections::BTreeMap;
use std::sync::Arc;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use village_engine::model::{
    Accessory, Agent, AgentId, AgentTraits, AnimationState, Building, BuildingId, BuildingKind,
    BuildingState, CubicSegment, Emotion, EyeType, MouthType, Prop, PropKind, Rect, RiverPath,
    ShirtStyle, Size, Vec2, VillageWorld, WorldLayout, WorldState,
};

use super::config::WorldProfile;

const RESIDENTS: [&str; 16] = [
    "Arthur", "Beatrix", "Caleb", "Diana", "Ethan", "Fiona", "George", "Helena", "Ivan", "Julia",
    "Kevin", "Luna", "Milo", "Nora", "Oscar", "Penny",
];

const RESIDENT_COLORS: [[u8; 4]; 16] = [
    [255, 85, 85, 255],
    [85, 255, 85, 255],
    [85, 85, 255, 255],
    [255, 255, 85, 255],
    [255, 85, 255, 255],
    [85, 255, 255, 255],
    [255, 165, 0, 255],
    [255, 255, 255, 255],
    [136, 136, 136, 255],
    [68, 68, 68, 255],
    [160, 82, 45, 255],
    [0, 255, 0, 255],
    [0, 0, 255, 255],
    [255, 0, 255, 255],
    [0, 255, 255, 255],
    [255, 255, 0, 255],
];

/// `(id, name, kind, x, y, w, h)` in base-layout units.
const LANDMARKS: [(u32, &str, BuildingKind, f32, f32, f32, f32); 6] = [
    (100, "Old Fountain", BuildingKind::Fountain, 750.0, 450.0, 100.0, 100.0),
    (101, "Plaza Central", BuildingKind::Square, 700.0, 400.0, 200.0, 200.0),
    (102, "Market Hall", BuildingKind::Shop, 650.0, 200.0, 120.0, 100.0),
    (103, "Corner Brews", BuildingKind::Shop, 830.0, 200.0, 120.0, 100.0),
    (104, "River Library", BuildingKind::Office, 650.0, 700.0, 120.0, 100.0),
    (105, "Lily Gym", BuildingKind::Office, 830.0, 700.0, 120.0, 100.0),
];

const FLOWER_BED_KINDS: [PropKind; 5] = [
    PropKind::Bush,
    PropKind::Grass,
    PropKind::FlowerRed,
    PropKind::FlowerBlue,
    PropKind::FlowerYellow,
];
const FLOWER_BED_NAMES: [&str; 4] = ["Petal Bloom", "Red Orchid", "Blue Lily", "Yellow Sun"];
const FLOWER_BED_COUNT: usize = 60;

const TREE_KINDS: [PropKind; 7] = [
    PropKind::Pine,
    PropKind::Banyan,
    PropKind::Willow,
    PropKind::Sakura,
    PropKind::Coconut,
    PropKind::Mango,
    PropKind::Jackfruit,
];
const TREE_COUNT: usize = 28;
const TREE_PLACEMENT_ATTEMPTS: usize = 40;
const TREE_CLEARANCE: f32 = 30.0;

const STARTING_DESTINATION: &str = "Plaza Central";
const EVENT_LOG_SEED: &str = "Villagers are settling into the new town.";

/// Builds the starting village for `profile`. Decoration placement and agent
/// spawn points are drawn from `seed`.
pub(crate) fn build_world(profile: WorldProfile, seed: u64) -> VillageWorld {
    let scale = profile.world_scale();
    let size = profile.world_size();
    let mut rng = SmallRng::seed_from_u64(seed);

    let buildings = build_buildings(scale);
    let layout = build_layout(scale, size);
    let props = scatter_props(&mut rng, scale, size, &buildings, &layout);
    let agents = build_roster(&mut rng, scale);

    let mut state = WorldState::default();
    state.push_event(EVENT_LOG_SEED, usize::MAX);

    VillageWorld {
        agents: Arc::new(agents),
        buildings,
        props,
        layout,
        state,
    }
}

fn build_buildings(scale: f32) -> Vec<Building> {
    let houses = RESIDENTS.iter().enumerate().map(|(index, name)| {
        let column_block = if index % 4 < 2 { 50.0 } else { 1250.0 };
        let x = column_block + (index % 2) as f32 * 160.0;
        let y = 50.0 + (index / 4) as f32 * 180.0;
        Building {
            id: BuildingId(index as u32),
            name: format!("{name}'s Home"),
            kind: BuildingKind::House,
            position: Vec2::new(x, y) * scale,
            size: Size {
                w: 100.0 * scale,
                h: 100.0 * scale,
            },
            state: BuildingState::Normal,
            owner_name: Some((*name).to_string()),
        }
    });

    let landmarks = LANDMARKS
        .iter()
        .map(|&(id, name, kind, x, y, w, h)| Building {
            id: BuildingId(id),
            name: name.to_string(),
            kind,
            position: Vec2::new(x, y) * scale,
            size: Size {
                w: w * scale,
                h: h * scale,
            },
            state: BuildingState::Normal,
            owner_name: None,
        });

    houses.chain(landmarks).collect()
}

fn build_layout(scale: f32, size: Vec2) -> WorldLayout {
    let rect = |x: f32, y: f32, w: f32, h: f32| Rect {
        x: x * scale,
        y: y * scale,
        w: w * scale,
        h: h * scale,
    };
    let point = |x: f32, y: f32| Vec2::new(x, y) * scale;

    WorldLayout {
        width: size.x,
        height: size.y,
        paths: vec![rect(50.0, 475.0, 1500.0, 50.0), rect(775.0, 50.0, 50.0, 900.0)],
        river: Some(RiverPath {
            start: point(400.0, -100.0),
            segments: vec![
                CubicSegment {
                    control_a: point(450.0, 300.0),
                    control_b: point(200.0, 600.0),
                    end: point(600.0, 800.0),
                },
                CubicSegment {
                    control_a: point(800.0, 1000.0),
                    control_b: point(1200.0, 1100.0),
                    end: point(1700.0, 1100.0),
                },
            ],
            width: 100.0 * scale,
        }),
        bridges: vec![rect(400.0, 350.0, 120.0, 50.0)],
    }
}

fn scatter_props(
    rng: &mut SmallRng,
    scale: f32,
    size: Vec2,
    buildings: &[Building],
    layout: &WorldLayout,
) -> Vec<Prop> {
    let mut props = Vec::with_capacity(FLOWER_BED_COUNT + TREE_COUNT);

    for index in 0..FLOWER_BED_COUNT {
        let position = Vec2::new(
            350.0 + rng.gen::<f32>() * 900.0,
            50.0 + rng.gen::<f32>() * 900.0,
        ) * scale;
        props.push(Prop {
            position,
            kind: FLOWER_BED_KINDS[index % FLOWER_BED_KINDS.len()],
            name: Some(FLOWER_BED_NAMES[index % FLOWER_BED_NAMES.len()].to_string()),
        });
    }

    let clearance = TREE_CLEARANCE * scale;
    for index in 0..TREE_COUNT {
        let spot = (0..TREE_PLACEMENT_ATTEMPTS)
            .map(|_| Vec2::new(rng.gen::<f32>() * size.x, rng.gen::<f32>() * size.y))
            .find(|candidate| is_open_ground(*candidate, clearance, buildings, layout));
        if let Some(position) = spot {
            props.push(Prop {
                position,
                kind: TREE_KINDS[index % TREE_KINDS.len()],
                name: None,
            });
        }
    }

    props
}

fn is_open_ground(point: Vec2, clearance: f32, buildings: &[Building], layout: &WorldLayout) -> bool {
    let clear_of = |x: f32, y: f32, w: f32, h: f32| {
        point.x < x - clearance
            || point.x > x + w + clearance
            || point.y < y - clearance
            || point.y > y + h + clearance
    };

    buildings.iter().all(|building| {
        clear_of(
            building.position.x,
            building.position.y,
            building.size.w,
            building.size.h,
        )
    }) && layout
        .paths
        .iter()
        .chain(layout.bridges.iter())
        .all(|rect| clear_of(rect.x, rect.y, rect.w, rect.h))
}

fn build_roster(rng: &mut SmallRng, scale: f32) -> Vec<Agent> {
    const EYES: [EyeType; 4] = [EyeType::Dot, EyeType::Slit, EyeType::Lightning, EyeType::Laser];
    const MOUTHS: [MouthType; 5] = [
        MouthType::Smile,
        MouthType::Mask,
        MouthType::Cigar,
        MouthType::Tentacles,
        MouthType::Teeth,
    ];
    const SHIRTS: [ShirtStyle; 5] = [
        ShirtStyle::Plain,
        ShirtStyle::Striped,
        ShirtStyle::Logo,
        ShirtStyle::Jersey,
        ShirtStyle::Suit,
    ];

    RESIDENTS
        .iter()
        .enumerate()
        .map(|(index, name)| {
            let accessory = match index % 4 {
                0 => Accessory::Hat,
                1 => Accessory::Shades,
                _ => Accessory::None,
            };
            let spawn = Vec2::new(
                800.0 + (rng.gen::<f32>() - 0.5) * 300.0,
                500.0 + (rng.gen::<f32>() - 0.5) * 300.0,
            ) * scale;

            Agent {
                id: AgentId(index as u64),
                name: (*name).to_string(),
                backstory: format!("Town resident living at {name}'s Home."),
                personality: "Unique".to_string(),
                color: RESIDENT_COLORS[index % RESIDENT_COLORS.len()],
                traits: AgentTraits {
                    eye: EYES[(index / 4) % EYES.len()],
                    mouth: MOUTHS[index % MOUTHS.len()],
                    accessory,
                    shirt: SHIRTS[(index / 2) % SHIRTS.len()],
                    shirt_text: Some(name.chars().take(3).collect()),
                },
                house_id: BuildingId(index as u32),
                emotional_state: Emotion::Neutral,
                current_thought: "Enjoying the cozy town layout.".to_string(),
                reasoning: "Everything is within walking distance.".to_string(),
                destination_name: STARTING_DESTINATION.to_string(),
                skills: BTreeMap::from([("social".to_string(), 7), ("energy".to_string(), 8)]),
                memories: Vec::new(),
                position: spawn,
                target: None,
                animation_state: AnimationState::Idle,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn every_resident_owns_an_existing_house() {
        let world = build_world(WorldProfile::Compact, 7);
        assert_eq!(world.agents.len(), RESIDENTS.len());
        for agent in world.agents.iter() {
            let house = world.building(agent.house_id).expect("house");
            assert_eq!(house.kind, BuildingKind::House);
            assert_eq!(house.owner_name.as_deref(), Some(agent.name.as_str()));
        }
        assert!(world.building_by_name(STARTING_DESTINATION).is_some());
    }

    #[test]
    fn building_ids_are_unique() {
        let world = build_world(WorldProfile::Compact, 7);
        let ids: HashSet<_> = world.buildings.iter().map(|building| building.id).collect();
        assert_eq!(ids.len(), world.buildings.len());
        assert_eq!(world.buildings.len(), RESIDENTS.len() + LANDMARKS.len());
    }

    #[test]
    fn same_seed_places_the_same_decorations() {
        let first = build_world(WorldProfile::Compact, 99);
        let second = build_world(WorldProfile::Compact, 99);
        let other = build_world(WorldProfile::Compact, 100);
        assert_eq!(first.props, second.props);
        assert_eq!(first.agents, second.agents);
        assert_ne!(first.props, other.props);
    }

    #[test]
    fn trees_avoid_buildings_and_paths() {
        let world = build_world(WorldProfile::Compact, 3);
        let trees: Vec<_> = world.props.iter().filter(|prop| prop.kind.is_tree()).collect();
        assert!(!trees.is_empty());
        for tree in trees {
            assert!(is_open_ground(
                tree.position,
                TREE_CLEARANCE,
                &world.buildings,
                &world.layout
            ));
        }
    }

    #[test]
    fn mega_profile_scales_the_layout() {
        let compact = build_world(WorldProfile::Compact, 5);
        let mega = build_world(WorldProfile::Mega, 5);
        assert_eq!(mega.layout.size(), WorldProfile::Mega.world_size());

        let hall = |world: &VillageWorld| world.building_by_name("Market Hall").cloned();
        let (small, large) = (hall(&compact).expect("hall"), hall(&mega).expect("hall"));
        assert_eq!(large.position, small.position * 2.0);
        assert_eq!(large.size.w, small.size.w * 2.0);
        for agent in mega.agents.iter() {
            assert!(agent.position.x >= 650.0 * 2.0 && agent.position.x <= 950.0 * 2.0);
        }
    }

    #[test]
    fn world_starts_idle_with_one_event() {
        let world = build_world(WorldProfile::Diorama, 1);
        assert!(world.agents.iter().all(|agent| !agent.is_walking()));
        assert_eq!(world.state.events.len(), 1);
        assert_eq!(world.state.latest_event(), Some(EVENT_LOG_SEED));
    }
}
