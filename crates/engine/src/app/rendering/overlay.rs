use crate::camera::ViewTransform;
use crate::model::{Agent, Vec2, Weather, WorldState};

use super::canvas::{Canvas, Rgba};

const RAIN_TINT: Rgba = [20, 30, 60, 40];
const STORM_TINT: Rgba = [10, 10, 25, 90];
const SNOW_TINT: Rgba = [230, 235, 255, 25];
const RAIN_STREAK: Rgba = [170, 190, 230, 110];
const STORM_FLASH: Rgba = [255, 255, 255, 90];
const SNOW_FLAKE: Rgba = [250, 250, 255, 220];
const HUD_PLATE: Rgba = [8, 10, 14, 180];
const HUD_TEXT: Rgba = [236, 240, 245, 255];
const HUD_EVENT_TEXT: Rgba = [255, 214, 120, 255];
const BUBBLE_FILL: Rgba = [250, 250, 245, 235];
const BUBBLE_TEXT: Rgba = [30, 30, 36, 255];
const BUBBLE_HEADER: Rgba = [90, 90, 110, 255];

const PIXELS_PER_RAIN_STREAK: u32 = 6_000;
const PIXELS_PER_SNOW_FLAKE: u32 = 9_000;
const MAX_PARTICLES: u32 = 600;
const RAIN_FALL_PER_FRAME: f32 = 12.0;
const RAIN_DRIFT_PER_FRAME: f32 = 2.0;
const SNOW_FALL_PER_FRAME: f32 = 1.0;
const STORM_FLASH_PERIOD: u64 = 240;
const STORM_FLASH_FRAMES: u64 = 4;
const HUD_MARGIN_PX: f32 = 8.0;
const EVENT_MAX_CHARS: usize = 64;
const BUBBLE_LINE_CHARS: usize = 28;
const BUBBLE_MAX_LINES: usize = 3;
const BUBBLE_LIFT_PX: f32 = 56.0;

/// Screen-space weather layer drawn over the whole world.
pub(crate) fn draw_weather(canvas: &mut Canvas<'_>, weather: Weather, frame_index: u64) {
    let (width, height) = (canvas.width() as f32, canvas.height() as f32);
    let area = canvas.width().saturating_mul(canvas.height());
    match weather {
        Weather::Sunny => {}
        Weather::Rainy => {
            canvas.fill_rect(0.0, 0.0, width, height, RAIN_TINT);
            draw_rain(canvas, area / PIXELS_PER_RAIN_STREAK, frame_index);
        }
        Weather::Stormy => {
            canvas.fill_rect(0.0, 0.0, width, height, STORM_TINT);
            draw_rain(canvas, area / PIXELS_PER_RAIN_STREAK * 2, frame_index);
            if storm_flash_active(frame_index) {
                canvas.fill_rect(0.0, 0.0, width, height, STORM_FLASH);
            }
        }
        Weather::Snowy => {
            canvas.fill_rect(0.0, 0.0, width, height, SNOW_TINT);
            draw_snow(canvas, area / PIXELS_PER_SNOW_FLAKE, frame_index);
        }
    }
}

pub(crate) fn storm_flash_active(frame_index: u64) -> bool {
    frame_index % STORM_FLASH_PERIOD < STORM_FLASH_FRAMES
}

/// Stable pseudo-random value in `0.0..1.0` for particle `index`.
pub(crate) fn scatter(index: u32, salt: u32) -> f32 {
    let mut value = index.wrapping_mul(0x9E37_79B9) ^ salt.wrapping_mul(0x85EB_CA6B);
    value ^= value >> 15;
    value = value.wrapping_mul(0x2C1B_3C6D);
    value ^= value >> 12;
    (value >> 8) as f32 / (1u32 << 24) as f32
}

fn draw_rain(canvas: &mut Canvas<'_>, count: u32, frame_index: u64) {
    let (width, height) = (canvas.width() as f32, canvas.height() as f32);
    let frame = (frame_index % 100_000) as f32;
    for index in 0..count.min(MAX_PARTICLES) {
        let x = (scatter(index, 1) * width + frame * RAIN_DRIFT_PER_FRAME).rem_euclid(width);
        let y = (scatter(index, 2) * height + frame * RAIN_FALL_PER_FRAME).rem_euclid(height);
        canvas.stroke_line(Vec2::new(x, y), Vec2::new(x - 2.0, y + 10.0), 1.0, RAIN_STREAK);
    }
}

fn draw_snow(canvas: &mut Canvas<'_>, count: u32, frame_index: u64) {
    let (width, height) = (canvas.width() as f32, canvas.height() as f32);
    let frame = (frame_index % 100_000) as f32;
    for index in 0..count.min(MAX_PARTICLES) {
        let drift = (frame * 0.02 + index as f32).sin() * 8.0;
        let x = (scatter(index, 3) * width + drift).rem_euclid(width);
        let y = (scatter(index, 4) * height + frame * SNOW_FALL_PER_FRAME).rem_euclid(height);
        canvas.fill_circle(Vec2::new(x, y), 1.5, SNOW_FLAKE);
    }
}

pub(crate) fn hud_lines(world: &WorldState) -> (String, Option<String>) {
    let status = format!(
        "DAY {}  {}  {}",
        world.day,
        world.clock_label(),
        world.weather.as_str().to_uppercase()
    );
    let event = world.latest_event().map(|event| truncate_chars(event, EVENT_MAX_CHARS));
    (status, event)
}

pub(crate) fn draw_hud(canvas: &mut Canvas<'_>, world: &WorldState, cell: f32) {
    let (status, event) = hud_lines(world);
    let line_height = canvas.measure_text(&status, cell).y + cell * 2.0;
    let mut width = canvas.measure_text(&status, cell).x;
    if let Some(event) = &event {
        width = width.max(canvas.measure_text(event, cell).x);
    }
    let lines = if event.is_some() { 2.0 } else { 1.0 };

    canvas.fill_rect(
        HUD_MARGIN_PX,
        HUD_MARGIN_PX,
        width + cell * 4.0,
        line_height * lines + cell * 2.0,
        HUD_PLATE,
    );
    let left = HUD_MARGIN_PX + cell * 2.0;
    let top = HUD_MARGIN_PX + cell * 2.0;
    canvas.fill_text(&status, Vec2::new(left, top), cell, HUD_TEXT);
    if let Some(event) = &event {
        canvas.fill_text(event, Vec2::new(left, top + line_height), cell, HUD_EVENT_TEXT);
    }
}

/// Thought bubble above `agent`, placed in screen space.
pub(crate) fn draw_thought_bubble(
    canvas: &mut Canvas<'_>,
    agent: &Agent,
    transform: ViewTransform,
    cell: f32,
) {
    let lines = wrap_text(&agent.current_thought, BUBBLE_LINE_CHARS, BUBBLE_MAX_LINES);
    if lines.is_empty() {
        return;
    }
    let header = format!("{} ({})", agent.name, agent.emotional_state.name());
    let anchor = transform.world_to_screen(agent.position);

    let line_height = canvas.measure_text("M", cell).y + cell * 2.0;
    let width = std::iter::once(&header)
        .chain(lines.iter())
        .map(|line| canvas.measure_text(line, cell).x)
        .fold(0.0f32, f32::max)
        + cell * 4.0;
    let height = line_height * (lines.len() + 1) as f32 + cell * 2.0;

    let left = anchor.x - width * 0.5;
    let bottom = anchor.y - BUBBLE_LIFT_PX * transform.scale.max(0.4);
    let top = bottom - height;
    canvas.fill_rect(left, top, width, height, BUBBLE_FILL);
    canvas.fill_circle(Vec2::new(anchor.x - 4.0, bottom + 6.0), 4.0, BUBBLE_FILL);
    canvas.fill_circle(Vec2::new(anchor.x - 8.0, bottom + 14.0), 2.5, BUBBLE_FILL);

    let text_left = left + cell * 2.0;
    let mut y = top + cell * 2.0;
    canvas.fill_text(&header, Vec2::new(text_left, y), cell, BUBBLE_HEADER);
    for line in &lines {
        y += line_height;
        canvas.fill_text(line, Vec2::new(text_left, y), cell, BUBBLE_TEXT);
    }
}

/// Greedy word wrap. Words longer than a line are split, and text past
/// `max_lines` is cut with a trailing `...`.
pub(crate) fn wrap_text(text: &str, line_chars: usize, max_lines: usize) -> Vec<String> {
    let line_chars = line_chars.max(4);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in text.split_whitespace() {
        let mut rest: Vec<char> = word.chars().collect();
        while !rest.is_empty() {
            let gap = usize::from(current_len > 0);
            if current_len + gap + rest.len() <= line_chars {
                if gap == 1 {
                    current.push(' ');
                }
                current_len += gap + rest.len();
                current.extend(rest.drain(..));
            } else if current_len == 0 {
                current.extend(rest.drain(..line_chars));
                current_len = line_chars;
            } else {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }

    if lines.len() > max_lines {
        lines.truncate(max_lines);
        if let Some(last) = lines.last_mut() {
            *last = truncate_chars(&format!("{last}..."), line_chars);
        }
    }
    lines
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    text.chars().take(keep).collect::<String>() + "..."
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scatter_stays_in_unit_range() {
        for index in 0..2_000 {
            let value = scatter(index, 7);
            assert!((0.0..1.0).contains(&value));
        }
        assert_ne!(scatter(1, 1), scatter(2, 1));
    }

    #[test]
    fn storm_flash_is_periodic_and_brief() {
        assert!(storm_flash_active(0));
        assert!(storm_flash_active(STORM_FLASH_PERIOD + 1));
        assert!(!storm_flash_active(STORM_FLASH_FRAMES));
        let lit = (0..STORM_FLASH_PERIOD).filter(|f| storm_flash_active(*f)).count();
        assert_eq!(lit as u64, STORM_FLASH_FRAMES);
    }

    #[test]
    fn sunny_weather_leaves_frame_untouched() {
        let mut buffer = vec![7u8; 64 * 64 * 4];
        draw_weather(&mut Canvas::new(&mut buffer, 64, 64), Weather::Sunny, 10);
        assert!(buffer.iter().all(|byte| *byte == 7));
    }

    #[test]
    fn storms_darken_more_than_rain() {
        let brightness = |weather| {
            let mut buffer = vec![200u8; 64 * 64 * 4];
            draw_weather(&mut Canvas::new(&mut buffer, 64, 64), weather, 10);
            buffer.chunks_exact(4).map(|p| u64::from(p[0])).sum::<u64>()
        };
        assert!(brightness(Weather::Stormy) < brightness(Weather::Rainy));
    }

    #[test]
    fn hud_reports_day_clock_weather_and_latest_event() {
        let mut world = WorldState {
            time: 1305,
            day: 4,
            weather: Weather::Rainy,
            ..WorldState::default()
        };
        let (status, event) = hud_lines(&world);
        assert_eq!(status, "DAY 4  13:05  RAINY");
        assert_eq!(event, None);

        world.push_event("Older", 5);
        world.push_event("Fire at the bakery", 5);
        let (_, event) = hud_lines(&world);
        assert_eq!(event.as_deref(), Some("Fire at the bakery"));
    }

    #[test]
    fn long_events_are_truncated() {
        let long = "x".repeat(100);
        let cut = truncate_chars(&long, EVENT_MAX_CHARS);
        assert_eq!(cut.chars().count(), EVENT_MAX_CHARS);
        assert!(cut.ends_with("..."));
    }

    #[test]
    fn wrap_keeps_words_together() {
        let lines = wrap_text("the quick brown fox jumps", 10, 5);
        assert_eq!(lines, vec!["the quick", "brown fox", "jumps"]);
    }

    #[test]
    fn wrap_splits_words_longer_than_a_line() {
        let lines = wrap_text("abcdefghijkl", 5, 5);
        assert_eq!(lines, vec!["abcde", "fghij", "kl"]);
    }

    #[test]
    fn wrap_marks_overflow_with_ellipsis() {
        let lines = wrap_text("one two three four five six seven", 9, 2);
        assert_eq!(lines.len(), 2);
        assert!(lines[1].ends_with("..."));
    }

    #[test]
    fn wrap_of_blank_text_is_empty() {
        assert!(wrap_text("   ", 10, 3).is_empty());
    }
}
