use std::f32::consts::{PI, TAU};

use crate::model::{Building, BuildingKind, BuildingState, Vec2};

use super::canvas::{with_alpha, Canvas, Rgba};

const SHADOW_COLOR: Rgba = [0, 0, 0, 60];
const HOUSE_BODY: Rgba = [78, 52, 46, 255];
const HOUSE_ROOF: Rgba = [121, 55, 40, 255];
const HOUSE_DOOR: Rgba = [40, 26, 20, 255];
const SHOP_BODY: Rgba = [38, 50, 56, 255];
const SHOP_AWNING_A: Rgba = [198, 40, 40, 255];
const SHOP_AWNING_B: Rgba = [238, 232, 220, 255];
const OFFICE_BODY: Rgba = [55, 71, 79, 255];
const WINDOW_DARK: Rgba = [28, 34, 44, 255];
const WINDOW_LIT: Rgba = [255, 214, 120, 255];
const FOUNTAIN_STONE: Rgba = [120, 124, 130, 255];
const FOUNTAIN_WATER: Rgba = [64, 160, 200, 255];
const FOUNTAIN_SPRAY: Rgba = [200, 236, 255, 200];
const PAVING_BASE: Rgba = [92, 84, 72, 255];
const PAVING_SEAM: Rgba = [72, 66, 56, 255];
const PARK_LAWN: Rgba = [56, 96, 44, 255];
const PARK_HEDGE: Rgba = [30, 62, 28, 255];
const POND_WATER: Rgba = [24, 66, 84, 255];
const POND_RIPPLE: Rgba = [160, 210, 230, 90];
const FLAME_OUTER: Rgba = [255, 112, 24, 230];
const FLAME_INNER: Rgba = [255, 224, 96, 240];
const SMOKE: Rgba = [40, 40, 40, 110];
const BUNTING: [Rgba; 4] = [
    [244, 67, 54, 255],
    [255, 235, 59, 255],
    [33, 150, 243, 255],
    [76, 175, 80, 255],
];
const CRACK: Rgba = [18, 14, 12, 255];
const RUBBLE: Rgba = [96, 90, 84, 255];
const LABEL_COLOR: Rgba = [244, 248, 252, 255];
const LABEL_PLATE: Rgba = [10, 12, 16, 150];
const HIGHLIGHT: Rgba = [255, 255, 255, 13];

const SHADOW_OFFSET: f32 = 6.0;
const FOUNTAIN_SPOUT_PERIOD: u64 = 60;
const FLAME_FLICKER_RATE: f32 = 0.3;

/// Whether the window of `building_id` is lit on `frame_index`. Buildings are
/// staggered by id so a street does not switch all at once.
pub(crate) fn window_lit(building_id: u32, frame_index: u64, period: u64) -> bool {
    let phase = frame_index / period.max(1) + u64::from(building_id);
    phase % 2 == 0
}

/// Height of the fountain jet on `frame_index`, in `0.0..=1.0`.
pub(crate) fn spout_height(frame_index: u64) -> f32 {
    let phase = (frame_index % FOUNTAIN_SPOUT_PERIOD) as f32 / FOUNTAIN_SPOUT_PERIOD as f32;
    (phase * PI).sin()
}

pub(crate) fn draw_building(
    canvas: &mut Canvas<'_>,
    building: &Building,
    frame_index: u64,
    window_period: u64,
    label_cell: Option<f32>,
) {
    let (w, h) = (building.size.w, building.size.h);
    canvas.save();
    canvas.translate(building.position.x, building.position.y);

    canvas.fill_rect(SHADOW_OFFSET, SHADOW_OFFSET, w, h, SHADOW_COLOR);
    let lit = window_lit(building.id.0, frame_index, window_period);
    match building.kind {
        BuildingKind::House => draw_house(canvas, w, h, lit),
        BuildingKind::Shop => draw_shop(canvas, w, h, lit),
        BuildingKind::Office => {
            draw_office(canvas, w, h, building.id.0, frame_index, window_period);
        }
        BuildingKind::Fountain => draw_fountain(canvas, w, h, frame_index),
        BuildingKind::Square | BuildingKind::Park | BuildingKind::Water => {
            draw_ground_body(canvas, building.kind, w, h, frame_index);
        }
    }
    canvas.fill_rect(w * 0.2, h * 0.2, w * 0.3, h * 0.3, HIGHLIGHT);
    draw_state_overlay(canvas, building.state, w, h, frame_index);

    if let Some(cell) = label_cell {
        draw_label(canvas, &building.name, w * 0.5, h + 4.0, cell);
    }
    canvas.restore();
}

/// Flat features painted with the terrain, beneath every upright entity.
pub(crate) fn draw_ground_feature(
    canvas: &mut Canvas<'_>,
    building: &Building,
    frame_index: u64,
    label_cell: Option<f32>,
) {
    let (w, h) = (building.size.w, building.size.h);
    canvas.save();
    canvas.translate(building.position.x, building.position.y);
    draw_ground_body(canvas, building.kind, w, h, frame_index);
    draw_state_overlay(canvas, building.state, w, h, frame_index);
    if let Some(cell) = label_cell {
        draw_label(canvas, &building.name, w * 0.5, 4.0, cell);
    }
    canvas.restore();
}

fn draw_ground_body(
    canvas: &mut Canvas<'_>,
    kind: BuildingKind,
    w: f32,
    h: f32,
    frame_index: u64,
) {
    match kind {
        BuildingKind::Square => {
            canvas.fill_rect(0.0, 0.0, w, h, PAVING_BASE);
            let tile = 25.0;
            let mut x = tile;
            while x < w {
                canvas.fill_rect(x - 1.0, 0.0, 2.0, h, PAVING_SEAM);
                x += tile;
            }
            let mut y = tile;
            while y < h {
                canvas.fill_rect(0.0, y - 1.0, w, 2.0, PAVING_SEAM);
                y += tile;
            }
        }
        BuildingKind::Park => {
            canvas.fill_rect(0.0, 0.0, w, h, PARK_LAWN);
            canvas.stroke_rect(0.0, 0.0, w, h, 6.0, PARK_HEDGE);
        }
        BuildingKind::Water => {
            let center = Vec2::new(w * 0.5, h * 0.5);
            canvas.fill_ellipse(center, w * 0.5, h * 0.5, POND_WATER);
            for ring in 0..3u64 {
                let grow = ((frame_index + ring * 40) % 120) as f32 / 120.0;
                canvas.stroke_arc(
                    center,
                    w.min(h) * 0.45 * grow,
                    0.0,
                    TAU,
                    1.0,
                    with_alpha(POND_RIPPLE, ((1.0 - grow) * POND_RIPPLE[3] as f32) as u8),
                );
            }
        }
        _ => canvas.fill_rect(0.0, 0.0, w, h, PAVING_BASE),
    }
}

fn draw_house(canvas: &mut Canvas<'_>, w: f32, h: f32, lit: bool) {
    canvas.fill_rect(0.0, 0.0, w, h, HOUSE_BODY);
    canvas.fill_triangle(
        Vec2::new(-6.0, h * 0.3),
        Vec2::new(w * 0.5, -h * 0.25),
        Vec2::new(w + 6.0, h * 0.3),
        HOUSE_ROOF,
    );
    canvas.fill_rect(w * 0.42, h * 0.62, w * 0.16, h * 0.38, HOUSE_DOOR);
    let window = if lit { WINDOW_LIT } else { WINDOW_DARK };
    canvas.fill_rect(w * 0.14, h * 0.45, w * 0.18, h * 0.16, window);
    canvas.fill_rect(w * 0.68, h * 0.45, w * 0.18, h * 0.16, window);
}

fn draw_shop(canvas: &mut Canvas<'_>, w: f32, h: f32, lit: bool) {
    canvas.fill_rect(0.0, 0.0, w, h, SHOP_BODY);
    let stripes = 6;
    let stripe_w = w / stripes as f32;
    for index in 0..stripes {
        let color = if index % 2 == 0 { SHOP_AWNING_A } else { SHOP_AWNING_B };
        canvas.fill_rect(index as f32 * stripe_w, h * 0.18, stripe_w, h * 0.14, color);
        canvas.fill_triangle(
            Vec2::new(index as f32 * stripe_w, h * 0.32),
            Vec2::new((index as f32 + 0.5) * stripe_w, h * 0.4),
            Vec2::new((index as f32 + 1.0) * stripe_w, h * 0.32),
            color,
        );
    }
    let window = if lit { WINDOW_LIT } else { WINDOW_DARK };
    canvas.fill_rect(w * 0.1, h * 0.5, w * 0.8, h * 0.25, window);
}

fn draw_office(
    canvas: &mut Canvas<'_>,
    w: f32,
    h: f32,
    building_id: u32,
    frame_index: u64,
    window_period: u64,
) {
    canvas.fill_rect(0.0, 0.0, w, h, OFFICE_BODY);
    let (cols, rows) = (4u32, 4u32);
    let cell_w = w / cols as f32;
    let cell_h = h / rows as f32;
    for row in 0..rows {
        for col in 0..cols {
            let lit = window_lit(
                building_id.wrapping_add(row * cols + col),
                frame_index,
                window_period,
            );
            let color = if lit { WINDOW_LIT } else { WINDOW_DARK };
            canvas.fill_rect(
                col as f32 * cell_w + cell_w * 0.2,
                row as f32 * cell_h + cell_h * 0.2,
                cell_w * 0.6,
                cell_h * 0.5,
                color,
            );
        }
    }
}

fn draw_fountain(canvas: &mut Canvas<'_>, w: f32, h: f32, frame_index: u64) {
    let center = Vec2::new(w * 0.5, h * 0.5);
    canvas.fill_ellipse(center, w * 0.5, h * 0.4, FOUNTAIN_STONE);
    canvas.fill_ellipse(center, w * 0.42, h * 0.32, FOUNTAIN_WATER);
    canvas.fill_rect(center.x - 4.0, center.y - 14.0, 8.0, 14.0, FOUNTAIN_STONE);

    let jet = spout_height(frame_index) * h * 0.45;
    let top = center.y - 14.0 - jet;
    canvas.fill_rect(center.x - 2.0, top, 4.0, jet, FOUNTAIN_SPRAY);
    for side in [-1.0f32, 1.0] {
        for drop in 0..3 {
            let spread = (drop + 1) as f32 * 6.0;
            canvas.fill_circle(
                Vec2::new(center.x + side * spread, top + spread * 0.8),
                2.0,
                FOUNTAIN_SPRAY,
            );
        }
    }
}

fn draw_state_overlay(
    canvas: &mut Canvas<'_>,
    state: BuildingState,
    w: f32,
    h: f32,
    frame_index: u64,
) {
    match state {
        BuildingState::Normal => {}
        BuildingState::Burning => {
            let flames = 4;
            for index in 0..flames {
                let base_x = w * (index as f32 + 0.5) / flames as f32;
                let flicker_phase = frame_index as f32 * FLAME_FLICKER_RATE + index as f32 * 1.9;
                let flicker = flicker_phase.sin() * 0.5 + 0.5;
                let height = h * (0.3 + 0.25 * flicker);
                canvas.fill_triangle(
                    Vec2::new(base_x - 10.0, 0.0),
                    Vec2::new(base_x, -height),
                    Vec2::new(base_x + 10.0, 0.0),
                    FLAME_OUTER,
                );
                canvas.fill_triangle(
                    Vec2::new(base_x - 5.0, 0.0),
                    Vec2::new(base_x, -height * 0.6),
                    Vec2::new(base_x + 5.0, 0.0),
                    FLAME_INNER,
                );
            }
            let drift = (frame_index % 90) as f32 / 90.0;
            canvas.fill_circle(
                Vec2::new(w * 0.5, -h * (0.6 + drift * 0.4)),
                12.0 + drift * 8.0,
                SMOKE,
            );
        }
        BuildingState::Festive => {
            let flags = 8;
            for index in 0..flags {
                let x0 = w * index as f32 / flags as f32;
                let x1 = w * (index + 1) as f32 / flags as f32;
                let wave = ((frame_index as f32 * 0.1) + index as f32).sin() * 1.5;
                canvas.fill_triangle(
                    Vec2::new(x0, -4.0),
                    Vec2::new(x1, -4.0),
                    Vec2::new((x0 + x1) * 0.5, 6.0 + wave),
                    BUNTING[index % BUNTING.len()],
                );
            }
        }
        BuildingState::Damaged => {
            let crack = [
                Vec2::new(w * 0.2, 0.0),
                Vec2::new(w * 0.35, h * 0.3),
                Vec2::new(w * 0.25, h * 0.55),
                Vec2::new(w * 0.45, h * 0.8),
            ];
            canvas.stroke_polyline(&crack, 2.0, CRACK, None);
            canvas.stroke_line(
                Vec2::new(w * 0.7, h * 0.1),
                Vec2::new(w * 0.6, h * 0.4),
                2.0,
                CRACK,
            );
            for index in 0..5 {
                canvas.fill_rect(
                    w * (0.1 + index as f32 * 0.18),
                    h - 4.0 + (index % 2) as f32 * 3.0,
                    7.0,
                    5.0,
                    RUBBLE,
                );
            }
        }
    }
}

fn draw_label(canvas: &mut Canvas<'_>, text: &str, center_x: f32, top: f32, cell: f32) {
    let size = canvas.measure_text(text, cell);
    let pad = cell;
    canvas.fill_rect(
        center_x - size.x * 0.5 - pad,
        top - pad,
        size.x + pad * 2.0,
        size.y + pad * 2.0,
        LABEL_PLATE,
    );
    canvas.fill_text_centered(text, center_x, top, cell, LABEL_COLOR);
}
