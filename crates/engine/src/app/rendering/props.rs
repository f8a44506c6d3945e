use std::f32::consts::TAU;

use crate::model::{Prop, PropKind, Vec2};

use super::canvas::{flatten_quadratic, Canvas, Rgba};

const SWAY_FREQUENCY_PER_FRAME: f32 = 0.01;
const SWAY_POSITION_PHASE: f32 = 0.1;
const SHADOW_COLOR: Rgba = [0, 0, 0, 38];
const TRUNK_DARK: Rgba = [45, 27, 16, 255];
const TRUNK_MID: Rgba = [61, 48, 40, 255];
const TRUNK_PALM: Rgba = [93, 64, 55, 255];
const PINE_COLOR: Rgba = [14, 31, 13, 255];
const PINE_TIP_COLOR: Rgba = [24, 48, 22, 255];
const BANYAN_LEAVES: [Rgba; 3] = [[26, 51, 23, 255], [37, 74, 33, 255], [45, 90, 39, 255]];
const WILLOW_STRAND: Rgba = [76, 110, 59, 255];
const SAKURA_PETALS: [Rgba; 3] = [[255, 193, 227, 255], [248, 187, 208, 255], [255, 255, 255, 255]];
const PALM_FROND: Rgba = [46, 125, 50, 255];
const MANGO_CANOPY: Rgba = [46, 94, 32, 255];
const MANGO_FRUIT: Rgba = [255, 179, 0, 255];
const JACKFRUIT_CANOPY: Rgba = [34, 70, 28, 255];
const JACKFRUIT_FRUIT: Rgba = [156, 170, 60, 255];
const BUSH_COLOR: Rgba = [38, 82, 35, 255];
const BUSH_HIGHLIGHT: Rgba = [58, 110, 48, 255];
const GRASS_COLOR: Rgba = [70, 120, 52, 255];
const STEM_COLOR: Rgba = [48, 96, 40, 255];
const FLOWER_RED: Rgba = [229, 57, 53, 255];
const FLOWER_BLUE: Rgba = [66, 133, 244, 255];
const FLOWER_YELLOW: Rgba = [253, 216, 53, 255];
const FLOWER_CENTER: Rgba = [255, 241, 200, 255];
const PROP_LABEL_COLOR: Rgba = [230, 236, 220, 200];

/// Horizontal sway for a prop at `position`. The phase depends on position so
/// neighbouring props do not move in lockstep.
pub(crate) fn sway_offset(position: Vec2, frame_index: u64, amplitude: f32) -> f32 {
    let phase = (position.x + position.y) * SWAY_POSITION_PHASE;
    (frame_index as f32 * SWAY_FREQUENCY_PER_FRAME + phase).sin() * amplitude
}

pub(crate) fn draw_prop(
    canvas: &mut Canvas<'_>,
    prop: &Prop,
    frame_index: u64,
    amplitude: f32,
    label_cell: Option<f32>,
) {
    let sway = sway_offset(prop.position, frame_index, amplitude);
    canvas.save();
    canvas.translate(prop.position.x, prop.position.y);

    if prop.kind.is_tree() {
        canvas.fill_ellipse(Vec2::new(0.0, 10.0), 25.0, 6.0, SHADOW_COLOR);
    }
    match prop.kind {
        PropKind::Pine => draw_pine(canvas, sway),
        PropKind::Banyan => draw_banyan(canvas, sway),
        PropKind::Willow => draw_willow(canvas, prop.position, frame_index, amplitude),
        PropKind::Sakura => draw_sakura(canvas, sway),
        PropKind::Coconut => draw_coconut(canvas, sway),
        PropKind::Mango => draw_fruit_tree(canvas, sway, MANGO_CANOPY, MANGO_FRUIT),
        PropKind::Jackfruit => draw_fruit_tree(canvas, sway, JACKFRUIT_CANOPY, JACKFRUIT_FRUIT),
        PropKind::Bush => draw_bush(canvas, sway),
        PropKind::Grass => draw_grass(canvas, sway),
        PropKind::FlowerRed => draw_flower(canvas, sway, FLOWER_RED),
        PropKind::FlowerBlue => draw_flower(canvas, sway, FLOWER_BLUE),
        PropKind::FlowerYellow => draw_flower(canvas, sway, FLOWER_YELLOW),
    }

    if let (Some(cell), Some(name)) = (label_cell, prop.name.as_deref()) {
        canvas.fill_text_centered(name, 0.0, 16.0, cell, PROP_LABEL_COLOR);
    }
    canvas.restore();
}

fn draw_pine(canvas: &mut Canvas<'_>, sway: f32) {
    canvas.fill_rect(-3.0, -6.0, 6.0, 14.0, TRUNK_DARK);
    canvas.fill_triangle(
        Vec2::new(sway, -60.0),
        Vec2::new(-30.0, 0.0),
        Vec2::new(30.0, 0.0),
        PINE_COLOR,
    );
    canvas.fill_triangle(
        Vec2::new(sway * 1.2, -75.0),
        Vec2::new(-22.0, -25.0),
        Vec2::new(22.0, -25.0),
        PINE_TIP_COLOR,
    );
}

fn draw_banyan(canvas: &mut Canvas<'_>, sway: f32) {
    canvas.fill_rect(-8.0, -5.0, 16.0, 20.0, TRUNK_DARK);
    for index in 0..24 {
        let leaf_sway = sway * (0.2 + index as f32 / 24.0);
        let angle = index as f32;
        canvas.fill_rect(
            angle.cos() * 45.0 + leaf_sway - 10.0,
            angle.sin() * 25.0 - 35.0,
            20.0,
            16.0,
            BANYAN_LEAVES[index % BANYAN_LEAVES.len()],
        );
    }
}

fn draw_willow(canvas: &mut Canvas<'_>, position: Vec2, frame_index: u64, amplitude: f32) {
    canvas.fill_rect(-3.0, -5.0, 6.0, 25.0, TRUNK_DARK);
    let base_phase = (position.x + position.y) * SWAY_POSITION_PHASE;
    for step in -5i32..=5 {
        let offset = step as f32 * 8.0;
        let strand_sway = (frame_index as f32 * SWAY_FREQUENCY_PER_FRAME
            + offset.abs() * 0.05
            + base_phase)
            .sin()
            * amplitude
            * 3.0;
        let strand = flatten_quadratic(
            Vec2::new(offset * 0.2, -15.0),
            Vec2::new(offset * 0.4 + strand_sway * 0.3, 10.0),
            Vec2::new(offset + strand_sway, 45.0),
            8,
        );
        canvas.stroke_polyline(&strand, 1.5, WILLOW_STRAND, None);
    }
}

fn draw_sakura(canvas: &mut Canvas<'_>, sway: f32) {
    canvas.fill_rect(-4.0, -5.0, 8.0, 18.0, TRUNK_MID);
    for index in 0..20 {
        let angle = index as f32 * 1.3;
        canvas.fill_rect(
            angle.sin() * 30.0 + sway,
            angle.cos() * 20.0 - 30.0,
            14.0,
            12.0,
            SAKURA_PETALS[index % SAKURA_PETALS.len()],
        );
    }
}

fn draw_coconut(canvas: &mut Canvas<'_>, sway: f32) {
    canvas.fill_rect(-4.0, -45.0, 8.0, 45.0, TRUNK_PALM);
    let crown = Vec2::new(0.0, -45.0);
    for index in 0..8 {
        let angle = index as f32 / 8.0 * TAU;
        let frond = flatten_quadratic(
            crown,
            Vec2::new(angle.cos() * 40.0 + sway * 1.5, -45.0 + angle.sin() * 15.0),
            Vec2::new(angle.cos() * 65.0 + sway * 1.5, -30.0 + angle.sin() * 25.0),
            8,
        );
        canvas.stroke_polyline(&frond, 3.0, PALM_FROND, None);
    }
}

fn draw_fruit_tree(canvas: &mut Canvas<'_>, sway: f32, canopy: Rgba, fruit: Rgba) {
    canvas.fill_rect(-5.0, -20.0, 10.0, 28.0, TRUNK_MID);
    canvas.fill_ellipse(Vec2::new(sway * 0.5, -40.0), 34.0, 26.0, canopy);
    for index in 0..5 {
        let angle = index as f32 * 1.7;
        canvas.fill_circle(
            Vec2::new(angle.cos() * 20.0 + sway * 0.5, -38.0 + angle.sin() * 12.0),
            4.0,
            fruit,
        );
    }
}

fn draw_bush(canvas: &mut Canvas<'_>, sway: f32) {
    let lean = sway * 0.25;
    canvas.fill_ellipse(Vec2::new(lean, -6.0), 14.0, 9.0, BUSH_COLOR);
    canvas.fill_ellipse(Vec2::new(lean - 4.0, -9.0), 6.0, 4.0, BUSH_HIGHLIGHT);
}

fn draw_grass(canvas: &mut Canvas<'_>, sway: f32) {
    for blade in -2i32..=2 {
        let base = Vec2::new(blade as f32 * 3.0, 0.0);
        let tip = Vec2::new(blade as f32 * 4.0 + sway * 0.5, -10.0 + blade.abs() as f32 * 1.5);
        canvas.stroke_line(base, tip, 1.5, GRASS_COLOR);
    }
}

fn draw_flower(canvas: &mut Canvas<'_>, sway: f32, petal: Rgba) {
    let head = Vec2::new(sway * 0.4, -10.0);
    canvas.stroke_line(Vec2::ZERO, head, 1.5, STEM_COLOR);
    for index in 0..5 {
        let angle = index as f32 / 5.0 * TAU;
        canvas.fill_circle(
            Vec2::new(head.x + angle.cos() * 3.0, head.y + angle.sin() * 3.0),
            2.2,
            petal,
        );
    }
    canvas.fill_circle(head, 1.6, FLOWER_CENTER);
}
