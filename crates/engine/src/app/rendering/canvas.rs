use std::f32::consts::TAU;

use crate::camera::ViewTransform;
use crate::model::Vec2;

use super::font::{
    glyph_cell_is_set, glyph_or_fallback, text_width_cells, GLYPH_ADVANCE_CELLS, GLYPH_HEIGHT,
    GLYPH_WIDTH,
};

pub type Rgba = [u8; 4];

const THIN_STROKE_PX: f32 = 1.5;
const ROUND_JOIN_MIN_PX: f32 = 3.0;
const ARC_SEGMENTS_PER_TURN: f32 = 32.0;
const DASH_MIN_RUN: f32 = 0.001;

pub const fn with_alpha(color: Rgba, alpha: u8) -> Rgba {
    [color[0], color[1], color[2], alpha]
}

/// Dash pattern in local units. A point at arc length `d` is inked when
/// `(d + offset) mod (on + off) < on`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dash {
    pub on: f32,
    pub off: f32,
    pub offset: f32,
}

impl Dash {
    fn period(&self) -> f32 {
        self.on + self.off
    }
}

/// RGBA frame with an affine transform stack.
///
/// Every coordinate handed to a drawing call is in local units and goes
/// through the current transform; lengths scale with it.
pub struct Canvas<'a> {
    frame: &'a mut [u8],
    width: u32,
    height: u32,
    transform: ViewTransform,
    saved: Vec<ViewTransform>,
}

impl<'a> Canvas<'a> {
    pub fn new(frame: &'a mut [u8], width: u32, height: u32) -> Self {
        Self {
            frame,
            width,
            height,
            transform: ViewTransform::default(),
            saved: Vec::new(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn transform(&self) -> ViewTransform {
        self.transform
    }

    pub fn set_transform(&mut self, transform: ViewTransform) {
        self.transform = transform;
    }

    pub fn reset_transform(&mut self) {
        self.transform = ViewTransform::default();
    }

    pub fn save(&mut self) {
        self.saved.push(self.transform);
    }

    pub fn restore(&mut self) {
        if let Some(transform) = self.saved.pop() {
            self.transform = transform;
        }
    }

    pub fn translate(&mut self, dx: f32, dy: f32) {
        self.transform.translate.x += dx * self.transform.scale;
        self.transform.translate.y += dy * self.transform.scale;
    }

    pub fn scale(&mut self, factor: f32) {
        self.transform.scale *= factor;
    }

    pub fn clear(&mut self, color: Rgba) {
        for chunk in self.frame.chunks_exact_mut(4) {
            chunk.copy_from_slice(&color);
        }
    }

    pub fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Rgba) {
        let a = self.to_screen(Vec2::new(x, y));
        let b = self.to_screen(Vec2::new(x + w, y + h));
        self.fill_screen_rect(a.x.min(b.x), a.y.min(b.y), a.x.max(b.x), a.y.max(b.y), color);
    }

    pub fn stroke_rect(&mut self, x: f32, y: f32, w: f32, h: f32, line_width: f32, color: Rgba) {
        let lw = line_width.min(w * 0.5).min(h * 0.5).max(0.0);
        self.fill_rect(x, y, w, lw, color);
        self.fill_rect(x, y + h - lw, w, lw, color);
        self.fill_rect(x, y + lw, lw, h - 2.0 * lw, color);
        self.fill_rect(x + w - lw, y + lw, lw, h - 2.0 * lw, color);
    }

    pub fn fill_ellipse(&mut self, center: Vec2, rx: f32, ry: f32, color: Rgba) {
        let center = self.to_screen(center);
        let rx = self.screen_len(rx);
        let ry = self.screen_len(ry);
        self.fill_screen_ellipse(center, rx, ry, color);
    }

    pub fn fill_circle(&mut self, center: Vec2, radius: f32, color: Rgba) {
        self.fill_ellipse(center, radius, radius, color);
    }

    pub fn fill_triangle(&mut self, a: Vec2, b: Vec2, c: Vec2, color: Rgba) {
        self.fill_polygon(&[a, b, c], color);
    }

    /// Even-odd scanline fill.
    pub fn fill_polygon(&mut self, points: &[Vec2], color: Rgba) {
        let screen: Vec<Vec2> = points.iter().map(|p| self.to_screen(*p)).collect();
        self.fill_screen_polygon(&screen, color);
    }

    pub fn stroke_line(&mut self, a: Vec2, b: Vec2, width: f32, color: Rgba) {
        let a = self.to_screen(a);
        let b = self.to_screen(b);
        let width = self.screen_len(width);
        self.stroke_screen_segment(a, b, width, color);
    }

    pub fn stroke_polyline(
        &mut self,
        points: &[Vec2],
        width: f32,
        color: Rgba,
        dash: Option<Dash>,
    ) {
        if points.len() < 2 {
            return;
        }
        match dash.filter(|dash| dash.on > 0.0 && dash.period() > 0.0) {
            Some(dash) => self.stroke_dashed(points, width, color, dash),
            None => self.stroke_solid(points, width, color),
        }
    }

    pub fn stroke_arc(
        &mut self,
        center: Vec2,
        radius: f32,
        start_angle: f32,
        end_angle: f32,
        width: f32,
        color: Rgba,
    ) {
        let sweep = end_angle - start_angle;
        let segments = ((sweep.abs() / TAU) * ARC_SEGMENTS_PER_TURN).ceil().max(2.0) as usize;
        let points: Vec<Vec2> = (0..=segments)
            .map(|step| {
                let angle = start_angle + sweep * step as f32 / segments as f32;
                Vec2::new(
                    center.x + angle.cos() * radius,
                    center.y + angle.sin() * radius,
                )
            })
            .collect();
        self.stroke_polyline(&points, width, color, None);
    }

    /// Draws `text` with its top-left corner at `origin`. `cell` is the size of
    /// one glyph pixel in local units; on screen it snaps to whole pixels.
    pub fn fill_text(&mut self, text: &str, origin: Vec2, cell: f32, color: Rgba) {
        let cell_px = self.text_cell_px(cell);
        let origin = self.to_screen(origin);
        let left = origin.x.round() as i32;
        let top = origin.y.round() as i32;

        for (index, ch) in text.chars().enumerate() {
            let bits = glyph_or_fallback(ch);
            if bits == 0 {
                continue;
            }
            let glyph_left = left + index as i32 * GLYPH_ADVANCE_CELLS * cell_px;
            if glyph_left >= self.width as i32 {
                break;
            }
            for row in 0..GLYPH_HEIGHT {
                for col in 0..GLYPH_WIDTH {
                    if !glyph_cell_is_set(bits, row, col) {
                        continue;
                    }
                    let x0 = glyph_left + col * cell_px;
                    let y0 = top + row * cell_px;
                    self.fill_screen_rect(
                        x0 as f32,
                        y0 as f32,
                        (x0 + cell_px) as f32,
                        (y0 + cell_px) as f32,
                        color,
                    );
                }
            }
        }
    }

    /// Text centered horizontally on `center_x` with its top edge at `top`.
    pub fn fill_text_centered(
        &mut self,
        text: &str,
        center_x: f32,
        top: f32,
        cell: f32,
        color: Rgba,
    ) {
        let size = self.measure_text(text, cell);
        self.fill_text(text, Vec2::new(center_x - size.x * 0.5, top), cell, color);
    }

    /// Size of `text` in local units as `fill_text` would draw it.
    pub fn measure_text(&self, text: &str, cell: f32) -> Vec2 {
        let cell_px = self.text_cell_px(cell) as f32;
        let scale = self.transform.scale.abs().max(f32::EPSILON);
        Vec2::new(
            text_width_cells(text) as f32 * cell_px / scale,
            GLYPH_HEIGHT as f32 * cell_px / scale,
        )
    }

    fn text_cell_px(&self, cell: f32) -> i32 {
        let px = self.screen_len(cell).round();
        if px.is_finite() {
            (px as i32).max(1)
        } else {
            1
        }
    }

    fn to_screen(&self, point: Vec2) -> Vec2 {
        self.transform.world_to_screen(point)
    }

    fn screen_len(&self, len: f32) -> f32 {
        len * self.transform.scale.abs()
    }

    fn stroke_solid(&mut self, points: &[Vec2], width: f32, color: Rgba) {
        let width_px = self.screen_len(width);
        let screen: Vec<Vec2> = points.iter().map(|p| self.to_screen(*p)).collect();
        for pair in screen.windows(2) {
            self.stroke_screen_segment(pair[0], pair[1], width_px, color);
        }
        if width_px >= ROUND_JOIN_MIN_PX && color[3] == u8::MAX {
            let radius = width_px * 0.5;
            for joint in &screen[1..screen.len() - 1] {
                self.fill_screen_ellipse(*joint, radius, radius, color);
            }
        }
    }

    fn stroke_dashed(&mut self, points: &[Vec2], width: f32, color: Rgba, dash: Dash) {
        let period = dash.period();
        let mut travelled = 0.0f32;
        for pair in points.windows(2) {
            let (start, end) = (pair[0], pair[1]);
            let length = start.distance_to(end);
            if length <= f32::EPSILON {
                continue;
            }
            let mut t = 0.0f32;
            while t < length {
                let phase = (travelled + t + dash.offset).rem_euclid(period);
                let inked = phase < dash.on;
                let run = if inked { dash.on - phase } else { period - phase };
                let run = run.min(length - t).max(DASH_MIN_RUN);
                if inked {
                    let a = lerp(start, end, t / length);
                    let b = lerp(start, end, ((t + run) / length).min(1.0));
                    self.stroke_line(a, b, width, color);
                }
                t += run;
            }
            travelled += length;
        }
    }

    fn stroke_screen_segment(&mut self, a: Vec2, b: Vec2, width_px: f32, color: Rgba) {
        if width_px <= THIN_STROKE_PX {
            self.draw_thin_screen_line(a, b, color);
            return;
        }
        let delta = b - a;
        let length = delta.length();
        let half = width_px * 0.5;
        if length <= f32::EPSILON {
            self.fill_screen_ellipse(a, half, half, color);
            return;
        }
        let normal = Vec2::new(-delta.y / length * half, delta.x / length * half);
        self.fill_screen_polygon(&[a + normal, b + normal, b - normal, a - normal], color);
    }

    fn draw_thin_screen_line(&mut self, a: Vec2, b: Vec2, color: Rgba) {
        if !(a.x.is_finite() && a.y.is_finite() && b.x.is_finite() && b.y.is_finite()) {
            return;
        }
        let delta = b - a;
        let steps = delta.x.abs().max(delta.y.abs()).ceil();
        let limit = (self.width.max(self.height) as f32) * 4.0;
        if steps > limit {
            // Clip absurdly long lines to the part that can matter.
            let Some((a, b)) = clip_segment(a, b, self.width as f32, self.height as f32) else {
                return;
            };
            self.draw_thin_screen_line(a, b, color);
            return;
        }
        let steps = steps.max(1.0) as i32;
        for step in 0..=steps {
            let p = lerp(a, b, step as f32 / steps as f32);
            self.blend_pixel(p.x.floor() as i32, p.y.floor() as i32, color);
        }
    }

    fn fill_screen_rect(&mut self, left: f32, top: f32, right: f32, bottom: f32, color: Rgba) {
        let (row_start, row_end) = self.row_range(top, bottom);
        for y in row_start..row_end {
            self.fill_span(y, left, right, color);
        }
    }

    fn fill_screen_ellipse(&mut self, center: Vec2, rx: f32, ry: f32, color: Rgba) {
        if !(rx > 0.0 && ry > 0.0) {
            return;
        }
        if rx < 0.5 && ry < 0.5 {
            self.blend_pixel(center.x.floor() as i32, center.y.floor() as i32, color);
            return;
        }
        let (row_start, row_end) = self.row_range(center.y - ry, center.y + ry);
        for y in row_start..row_end {
            let dy = (y as f32 + 0.5 - center.y) / ry;
            if dy.abs() > 1.0 {
                continue;
            }
            let half = rx * (1.0 - dy * dy).sqrt();
            self.fill_span(y, center.x - half, center.x + half, color);
        }
    }

    fn fill_screen_polygon(&mut self, points: &[Vec2], color: Rgba) {
        if points.len() < 3 || points.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
            return;
        }
        let top = points.iter().map(|p| p.y).fold(f32::INFINITY, f32::min);
        let bottom = points.iter().map(|p| p.y).fold(f32::NEG_INFINITY, f32::max);
        let (row_start, row_end) = self.row_range(top, bottom);
        let mut crossings: Vec<f32> = Vec::with_capacity(points.len());

        for y in row_start..row_end {
            let scan_y = y as f32 + 0.5;
            crossings.clear();
            for (index, start) in points.iter().enumerate() {
                let end = points[(index + 1) % points.len()];
                let spans_row = (start.y <= scan_y && scan_y < end.y)
                    || (end.y <= scan_y && scan_y < start.y);
                if spans_row {
                    let t = (scan_y - start.y) / (end.y - start.y);
                    crossings.push(start.x + (end.x - start.x) * t);
                }
            }
            crossings.sort_by(f32::total_cmp);
            for pair in crossings.chunks_exact(2) {
                self.fill_span(y, pair[0], pair[1], color);
            }
        }
    }

    /// Rows whose pixel centers fall in `[top, bottom)`, clipped to the frame.
    fn row_range(&self, top: f32, bottom: f32) -> (i32, i32) {
        let start = ((top - 0.5).ceil().max(0.0)) as i32;
        let end = ((bottom - 0.5).ceil().min(self.height as f32)) as i32;
        (start, end)
    }

    fn fill_span(&mut self, y: i32, left: f32, right: f32, color: Rgba) {
        if y < 0 || y >= self.height as i32 {
            return;
        }
        let start = ((left - 0.5).ceil().max(0.0)) as i32;
        let end = ((right - 0.5).ceil().min(self.width as f32)) as i32;
        for x in start..end {
            self.blend_pixel(x, y, color);
        }
    }

    fn blend_pixel(&mut self, x: i32, y: i32, color: Rgba) {
        if color[3] == 0 || x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }
        let Some(pixel_offset) = (y as usize)
            .checked_mul(self.width as usize)
            .and_then(|row| row.checked_add(x as usize))
        else {
            return;
        };
        let Some(byte_offset) = pixel_offset.checked_mul(4) else {
            return;
        };
        let Some(end) = byte_offset.checked_add(4) else {
            return;
        };
        if end > self.frame.len() {
            return;
        }
        let dst = &mut self.frame[byte_offset..end];
        if color[3] == u8::MAX {
            dst.copy_from_slice(&color);
            return;
        }
        let alpha = color[3] as u32;
        let inverse = 255 - alpha;
        for channel in 0..3 {
            dst[channel] = ((color[channel] as u32 * alpha + dst[channel] as u32 * inverse + 127)
                / 255) as u8;
        }
        dst[3] = u8::MAX;
    }
}

/// Points along a cubic Bezier, `start` and `end` included.
pub fn flatten_cubic(
    start: Vec2,
    control_a: Vec2,
    control_b: Vec2,
    end: Vec2,
    segments: usize,
) -> Vec<Vec2> {
    let segments = segments.max(1);
    (0..=segments)
        .map(|step| {
            let t = step as f32 / segments as f32;
            let u = 1.0 - t;
            start * (u * u * u)
                + control_a * (3.0 * u * u * t)
                + control_b * (3.0 * u * t * t)
                + end * (t * t * t)
        })
        .collect()
}

pub fn flatten_quadratic(start: Vec2, control: Vec2, end: Vec2, segments: usize) -> Vec<Vec2> {
    let segments = segments.max(1);
    (0..=segments)
        .map(|step| {
            let t = step as f32 / segments as f32;
            let u = 1.0 - t;
            start * (u * u) + control * (2.0 * u * t) + end * (t * t)
        })
        .collect()
}

fn lerp(a: Vec2, b: Vec2, t: f32) -> Vec2 {
    a + (b - a) * t
}

/// Liang-Barsky clip of a segment to `[0, width] x [0, height]`.
fn clip_segment(a: Vec2, b: Vec2, width: f32, height: f32) -> Option<(Vec2, Vec2)> {
    let delta = b - a;
    let mut t0 = 0.0f32;
    let mut t1 = 1.0f32;
    let edges = [
        (-delta.x, a.x),
        (delta.x, width - a.x),
        (-delta.y, a.y),
        (delta.y, height - a.y),
    ];
    for (p, q) in edges {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            t0 = t0.max(r);
        } else {
            t1 = t1.min(r);
        }
        if t0 > t1 {
            return None;
        }
    }
    Some((lerp(a, b, t0), lerp(a, b, t1)))
}
