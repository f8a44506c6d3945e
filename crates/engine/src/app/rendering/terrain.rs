use crate::model::{Building, Rect, RiverPath, Vec2, WorldLayout};

use super::buildings::draw_ground_feature;
use super::canvas::{flatten_cubic, Canvas, Dash, Rgba};

const GRASS_COLOR: Rgba = [42, 66, 33, 255];
const GRASS_TUFT: Rgba = [50, 78, 40, 255];
const PATH_COLOR: Rgba = [93, 78, 59, 255];
const PATH_EDGE: Rgba = [72, 60, 45, 255];
const RIVER_BANK: Rgba = [10, 26, 28, 255];
const RIVER_WATER: Rgba = [18, 53, 58, 255];
const RIVER_FILAMENT: Rgba = [255, 255, 255, 13];
const BRIDGE_DECK: Rgba = [109, 76, 54, 255];
const BRIDGE_PLANK_SEAM: Rgba = [78, 52, 36, 255];
const BRIDGE_RAIL: Rgba = [62, 40, 28, 255];

const RIVER_SEGMENT_STEPS: usize = 24;
const RIVER_BANK_EXTRA: f32 = 10.0;
const FILAMENT_WIDTH: f32 = 2.0;
const PLANK_SPACING: f32 = 8.0;
const TUFT_SPACING: f32 = 90.0;

#[derive(Debug, Clone, Copy)]
pub(crate) struct TerrainStyle {
    pub water_dash: [f32; 2],
    pub water_flow_speed: f32,
    pub label_cell: Option<f32>,
}

/// Ground layer: grass, paths, the river and its bridges, then flat
/// building footprints. Everything here sits beneath the sorted entities.
pub(crate) fn draw_terrain(
    canvas: &mut Canvas<'_>,
    layout: &WorldLayout,
    buildings: &[Building],
    frame_index: u64,
    style: TerrainStyle,
) {
    canvas.fill_rect(0.0, 0.0, layout.width, layout.height, GRASS_COLOR);
    draw_grass_tufts(canvas, layout);

    for path in &layout.paths {
        draw_path(canvas, path);
    }
    if let Some(river) = &layout.river {
        draw_river(canvas, river, frame_index, style);
    }
    for bridge in &layout.bridges {
        draw_bridge(canvas, bridge);
    }
    for building in buildings.iter().filter(|b| b.kind.is_ground_level()) {
        draw_ground_feature(canvas, building, frame_index, style.label_cell);
    }
}

/// Centerline of the river as a polyline through every cubic segment.
pub(crate) fn river_polyline(river: &RiverPath) -> Vec<Vec2> {
    let mut points = vec![river.start];
    let mut from = river.start;
    for segment in &river.segments {
        let curve = flatten_cubic(
            from,
            segment.control_a,
            segment.control_b,
            segment.end,
            RIVER_SEGMENT_STEPS,
        );
        points.extend(curve.into_iter().skip(1));
        from = segment.end;
    }
    points
}

/// Dash offset for the flowing filaments. Negative so the pattern travels
/// downstream as frames advance.
pub(crate) fn water_dash_offset(frame_index: u64, flow_speed: f32) -> f32 {
    -(frame_index as f32) * flow_speed
}

fn draw_grass_tufts(canvas: &mut Canvas<'_>, layout: &WorldLayout) {
    let mut y = TUFT_SPACING * 0.5;
    let mut row = 0u32;
    while y < layout.height {
        let mut x = if row % 2 == 0 { TUFT_SPACING * 0.5 } else { TUFT_SPACING };
        while x < layout.width {
            canvas.fill_ellipse(Vec2::new(x, y), 14.0, 5.0, GRASS_TUFT);
            x += TUFT_SPACING;
        }
        y += TUFT_SPACING;
        row += 1;
    }
}

fn draw_path(canvas: &mut Canvas<'_>, path: &Rect) {
    canvas.fill_rect(path.x, path.y, path.w, path.h, PATH_COLOR);
    canvas.stroke_rect(path.x, path.y, path.w, path.h, 2.0, PATH_EDGE);
}

fn draw_river(canvas: &mut Canvas<'_>, river: &RiverPath, frame_index: u64, style: TerrainStyle) {
    let points = river_polyline(river);
    canvas.stroke_polyline(&points, river.width + RIVER_BANK_EXTRA, RIVER_BANK, None);
    canvas.stroke_polyline(&points, river.width * 0.7, RIVER_WATER, None);

    let [on, off] = style.water_dash;
    let offset = water_dash_offset(frame_index, style.water_flow_speed);
    let lanes = [-0.25f32, 0.0, 0.25];
    for (lane, shift) in lanes.iter().enumerate() {
        let lateral = river.width * shift;
        let lane_points: Vec<Vec2> = points
            .iter()
            .map(|point| Vec2::new(point.x + lateral, point.y))
            .collect();
        let dash = Dash {
            on,
            off,
            offset: offset + lane as f32 * (on + off) / lanes.len() as f32,
        };
        canvas.stroke_polyline(&lane_points, FILAMENT_WIDTH, RIVER_FILAMENT, Some(dash));
    }
}

fn draw_bridge(canvas: &mut Canvas<'_>, bridge: &Rect) {
    canvas.fill_rect(bridge.x, bridge.y, bridge.w, bridge.h, BRIDGE_DECK);
    let mut x = bridge.x + PLANK_SPACING;
    while x < bridge.x + bridge.w {
        canvas.stroke_line(
            Vec2::new(x, bridge.y),
            Vec2::new(x, bridge.y + bridge.h),
            1.0,
            BRIDGE_PLANK_SEAM,
        );
        x += PLANK_SPACING;
    }
    canvas.fill_rect(bridge.x, bridge.y - 2.0, bridge.w, 4.0, BRIDGE_RAIL);
    canvas.fill_rect(bridge.x, bridge.y + bridge.h - 2.0, bridge.w, 4.0, BRIDGE_RAIL);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CubicSegment;

    fn river() -> RiverPath {
        RiverPath {
            start: Vec2::new(0.0, 50.0),
            segments: vec![
                CubicSegment {
                    control_a: Vec2::new(30.0, 20.0),
                    control_b: Vec2::new(60.0, 80.0),
                    end: Vec2::new(100.0, 50.0),
                },
                CubicSegment {
                    control_a: Vec2::new(130.0, 20.0),
                    control_b: Vec2::new(160.0, 80.0),
                    end: Vec2::new(200.0, 50.0),
                },
            ],
            width: 40.0,
        }
    }

    fn layout() -> WorldLayout {
        WorldLayout {
            width: 200.0,
            height: 100.0,
            paths: vec![Rect {
                x: 0.0,
                y: 80.0,
                w: 200.0,
                h: 12.0,
            }],
            river: Some(river()),
            bridges: vec![Rect {
                x: 90.0,
                y: 40.0,
                w: 20.0,
                h: 20.0,
            }],
        }
    }

    fn style() -> TerrainStyle {
        TerrainStyle {
            water_dash: [30.0, 120.0],
            water_flow_speed: 2.0,
            label_cell: None,
        }
    }

    #[test]
    fn river_polyline_runs_from_start_through_every_segment_end() {
        let points = river_polyline(&river());
        assert_eq!(points.len(), 1 + RIVER_SEGMENT_STEPS * 2);
        assert_eq!(points[0], Vec2::new(0.0, 50.0));
        assert_eq!(points[RIVER_SEGMENT_STEPS], Vec2::new(100.0, 50.0));
        assert_eq!(points.last().copied(), Some(Vec2::new(200.0, 50.0)));
    }

    #[test]
    fn river_without_segments_is_a_single_point() {
        let lone = RiverPath {
            start: Vec2::new(5.0, 5.0),
            segments: Vec::new(),
            width: 10.0,
        };
        assert_eq!(river_polyline(&lone), vec![Vec2::new(5.0, 5.0)]);
    }

    #[test]
    fn water_offset_moves_with_frames() {
        assert_eq!(water_dash_offset(0, 2.0), 0.0);
        assert_eq!(water_dash_offset(10, 2.0), -20.0);
        assert!(water_dash_offset(11, 2.0) < water_dash_offset(10, 2.0));
    }

    #[test]
    fn terrain_animates_the_water_between_frames() {
        let mut first = vec![0u8; 200 * 100 * 4];
        let mut later = vec![0u8; 200 * 100 * 4];
        draw_terrain(&mut Canvas::new(&mut first, 200, 100), &layout(), &[], 0, style());
        draw_terrain(&mut Canvas::new(&mut later, 200, 100), &layout(), &[], 25, style());
        assert_ne!(first, later);
    }

    #[test]
    fn terrain_covers_the_world_with_grass_and_paths() {
        let mut buffer = vec![0u8; 200 * 100 * 4];
        draw_terrain(&mut Canvas::new(&mut buffer, 200, 100), &layout(), &[], 0, style());
        assert!(buffer.chunks_exact(4).all(|pixel| pixel[3] == u8::MAX));
        let path_pixel = (86 * 200 + 40) * 4;
        assert_eq!(&buffer[path_pixel..path_pixel + 4], &PATH_COLOR);
    }
}
