use crate::model::{Agent, Building, Prop};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DrawItem<'a> {
    Building(&'a Building),
    Prop(&'a Prop),
    Agent(&'a Agent),
}

impl DrawItem<'_> {
    /// Tie-break for equal sort keys: agents stay in front.
    fn layer_rank(&self) -> u8 {
        match self {
            DrawItem::Building(_) => 0,
            DrawItem::Prop(_) => 1,
            DrawItem::Agent(_) => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawEntry<'a> {
    pub sort_key: f32,
    pub item: DrawItem<'a>,
}

/// Painter's-order list of every upright entity.
///
/// Buildings sort by the bottom edge of their footprint, props by their base
/// and agents by their feet plus `agent_front_bias`. Flat ground features are
/// left out; the terrain pass paints them.
pub fn build_draw_list<'a>(
    agents: &'a [Agent],
    buildings: &'a [Building],
    props: &'a [Prop],
    agent_front_bias: f32,
) -> Vec<DrawEntry<'a>> {
    let mut entries = Vec::with_capacity(agents.len() + buildings.len() + props.len());
    entries.extend(
        buildings
            .iter()
            .filter(|building| !building.kind.is_ground_level())
            .map(|building| DrawEntry {
                sort_key: building.footprint_bottom(),
                item: DrawItem::Building(building),
            }),
    );
    entries.extend(props.iter().map(|prop| DrawEntry {
        sort_key: prop.position.y,
        item: DrawItem::Prop(prop),
    }));
    entries.extend(agents.iter().map(|agent| DrawEntry {
        sort_key: agent.position.y + agent_front_bias,
        item: DrawItem::Agent(agent),
    }));

    entries.sort_by(|left, right| {
        left.sort_key
            .total_cmp(&right.sort_key)
            .then_with(|| left.item.layer_rank().cmp(&right.item.layer_rank()))
    });
    entries
}
