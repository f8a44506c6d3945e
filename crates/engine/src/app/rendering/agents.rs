use std::f32::consts::{PI, TAU};

use crate::model::{Accessory, Agent, AnimationState, EyeType, MouthType, ShirtStyle, Vec2};

use super::canvas::{with_alpha, Canvas, Rgba};

const SHADOW_COLOR: Rgba = [0, 0, 0, 51];
const EYE_WHITE: Rgba = [255, 255, 255, 255];
const EYE_IRIS: Rgba = [255, 222, 0, 255];
const INK: Rgba = [0, 0, 0, 255];
const MASK_COLOR: Rgba = [255, 51, 170, 255];
const CIGAR_COLOR: Rgba = [121, 85, 72, 255];
const EMBER_COLOR: Rgba = [255, 87, 34, 255];
const TEETH_COLOR: Rgba = [250, 250, 240, 255];
const TENTACLE_COLOR: Rgba = [90, 40, 110, 255];
const LASER_COLOR: Rgba = [255, 30, 30, 255];
const LIGHTNING_COLOR: Rgba = [255, 235, 59, 255];
const STRIPE_SHADE: Rgba = [0, 0, 0, 51];
const LOGO_PLATE: Rgba = [245, 245, 245, 255];
const JERSEY_COLOR: Rgba = [21, 101, 192, 255];
const SUIT_COLOR: Rgba = [33, 33, 40, 255];
const SHIRT_TEXT_COLOR: Rgba = [20, 20, 20, 255];
const JERSEY_TEXT_COLOR: Rgba = [255, 255, 255, 255];
const TIE_COLOR: Rgba = [183, 28, 28, 255];
const HAT_COLOR: Rgba = [40, 30, 28, 255];
const HAT_BAND: Rgba = [160, 40, 40, 255];
const SHADES_COLOR: Rgba = [12, 12, 16, 255];
const CHAIN_COLOR: Rgba = [255, 196, 0, 255];
const HALO_COLOR: Rgba = [255, 236, 120, 230];
const WATCH_FACE: Rgba = [250, 200, 40, 255];
const SELECTED_HIGHLIGHT_COLOR: Rgba = [80, 220, 255, 255];
const HOVER_HIGHLIGHT_COLOR: Rgba = [255, 210, 70, 255];
const NAME_TAG_PLATE: Rgba = [10, 12, 16, 170];
const NAME_TAG_TEXT: Rgba = [244, 248, 252, 255];

const WALK_BOB_RATE: f32 = 0.5;
const WALK_BOB_HEIGHT: f32 = 8.0;
const WALK_LEG_SWING: f32 = 4.0;
const BREATH_RATE: f32 = 0.1;
const BREATH_DEPTH: f32 = 2.0;
const SCAN_RATE: f32 = 0.1;
const SCAN_REACH: f32 = 2.0;
const WATCH_RATE: f32 = 0.3;
const WATCH_WIGGLE: f32 = 5.0;
const GESTURE_RATE: f32 = 0.2;
const GESTURE_LIFT: f32 = 10.0;
const WORK_RATE: f32 = 0.4;
const WORK_SWING: f32 = 4.0;
const AGENT_PHASE_STRIDE: f32 = 0.7;
const HIGHLIGHT_RADIUS: f32 = 22.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AgentHighlight {
    None,
    Hovered,
    Focused,
}

/// Procedural offsets for one frame, in unscaled body units.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct AgentPose {
    /// Upward lift of the whole body.
    pub bob: f32,
    pub eye_shift: f32,
    pub left_arm: f32,
    pub right_arm: f32,
    pub leg_swing: f32,
}

pub(crate) fn agent_pose(state: AnimationState, frame_index: u64, agent_phase: f32) -> AgentPose {
    let t = frame_index as f32;
    match state {
        AnimationState::Idle => AgentPose::default(),
        AnimationState::Walking => {
            let stride = (t * WALK_BOB_RATE + agent_phase).sin();
            AgentPose {
                bob: stride.abs() * WALK_BOB_HEIGHT,
                left_arm: stride * WALK_LEG_SWING,
                right_arm: -stride * WALK_LEG_SWING,
                leg_swing: stride * WALK_LEG_SWING,
                ..AgentPose::default()
            }
        }
        AnimationState::Breathing => AgentPose {
            bob: (t * BREATH_RATE + agent_phase).sin() * BREATH_DEPTH,
            ..AgentPose::default()
        },
        AnimationState::Scanning => AgentPose {
            eye_shift: (t * SCAN_RATE + agent_phase).sin() * SCAN_REACH,
            ..AgentPose::default()
        },
        AnimationState::CheckingWatch => AgentPose {
            left_arm: (t * WATCH_RATE).sin() * WATCH_WIGGLE,
            ..AgentPose::default()
        },
        AnimationState::Gesturing => AgentPose {
            right_arm: -(t * GESTURE_RATE + agent_phase).sin().abs() * GESTURE_LIFT,
            ..AgentPose::default()
        },
        AnimationState::Working => {
            let swing = (t * WORK_RATE + agent_phase).sin() * WORK_SWING;
            AgentPose {
                bob: swing.abs() * 0.25,
                left_arm: swing,
                right_arm: swing,
                ..AgentPose::default()
            }
        }
    }
}

pub(crate) fn draw_agent(
    canvas: &mut Canvas<'_>,
    agent: &Agent,
    frame_index: u64,
    body_scale: f32,
    highlight: AgentHighlight,
    label_cell: Option<f32>,
) {
    let agent_phase = agent.id.0 as f32 * AGENT_PHASE_STRIDE;
    let pose = agent_pose(agent.animation_state, frame_index, agent_phase);

    canvas.save();
    canvas.translate(agent.position.x, agent.position.y);
    match highlight {
        AgentHighlight::None => {}
        AgentHighlight::Hovered => {
            canvas.stroke_arc(Vec2::new(0.0, 4.0), HIGHLIGHT_RADIUS, 0.0, TAU, 1.5, HOVER_HIGHLIGHT_COLOR);
        }
        AgentHighlight::Focused => {
            canvas.stroke_arc(Vec2::new(0.0, 4.0), HIGHLIGHT_RADIUS, 0.0, TAU, 2.5, SELECTED_HIGHLIGHT_COLOR);
            canvas.stroke_arc(
                Vec2::new(0.0, 4.0),
                HIGHLIGHT_RADIUS + 4.0,
                0.0,
                TAU,
                1.0,
                with_alpha(SELECTED_HIGHLIGHT_COLOR, 120),
            );
        }
    }

    canvas.save();
    canvas.scale(body_scale);
    draw_body(canvas, agent, pose);
    canvas.restore();

    if let Some(cell) = label_cell {
        draw_name_tag(canvas, agent, -58.0 * body_scale - 6.0 * cell, cell);
    }
    canvas.restore();
}

fn draw_body(canvas: &mut Canvas<'_>, agent: &Agent, pose: AgentPose) {
    let lift = -pose.bob;
    canvas.fill_ellipse(Vec2::new(0.0, 12.0), 18.0, 6.0, SHADOW_COLOR);

    let leg_color = shade(agent.color, 0.7);
    canvas.fill_rect(-9.0 + pose.leg_swing * 0.5, -8.0 + lift, 6.0, 12.0 - pose.leg_swing.max(0.0), leg_color);
    canvas.fill_rect(3.0 - pose.leg_swing * 0.5, -8.0 + lift, 6.0, 12.0 + pose.leg_swing.min(0.0), leg_color);

    canvas.fill_rect(-12.0, -30.0 + lift, 24.0, 22.0, agent.color);
    draw_shirt(canvas, agent, lift);

    canvas.fill_rect(-18.0, -15.0 + lift + pose.left_arm, 6.0, 12.0, agent.color);
    canvas.fill_rect(12.0, -15.0 + lift + pose.right_arm, 6.0, 12.0, agent.color);
    if agent.animation_state == AnimationState::CheckingWatch {
        canvas.fill_circle(Vec2::new(-15.0, -6.0 + lift + pose.left_arm), 2.5, WATCH_FACE);
    }

    for eye_x in [-7.0f32, 7.0] {
        draw_eye(canvas, agent.traits.eye, Vec2::new(eye_x, -32.0 + lift), pose.eye_shift);
    }
    draw_mouth(canvas, agent.traits.mouth, lift);
    draw_accessory(canvas, agent.traits.accessory, lift);
}

fn draw_eye(canvas: &mut Canvas<'_>, eye: EyeType, center: Vec2, shift: f32) {
    canvas.fill_circle(center, 7.0, EYE_WHITE);
    canvas.fill_circle(center, 5.0, EYE_IRIS);
    let pupil = Vec2::new(center.x + shift, center.y);
    match eye {
        EyeType::Dot => canvas.fill_rect(pupil.x - 1.5, pupil.y - 1.0, 3.0, 3.0, INK),
        EyeType::Slit => canvas.fill_rect(pupil.x - 0.75, pupil.y - 3.5, 1.5, 7.0, INK),
        EyeType::Lightning => {
            let bolt = [
                Vec2::new(pupil.x - 1.5, pupil.y - 4.0),
                Vec2::new(pupil.x + 1.0, pupil.y - 1.0),
                Vec2::new(pupil.x - 1.0, pupil.y + 0.5),
                Vec2::new(pupil.x + 1.5, pupil.y + 4.0),
            ];
            canvas.fill_circle(pupil, 3.0, INK);
            canvas.stroke_polyline(&bolt, 1.2, LIGHTNING_COLOR, None);
        }
        EyeType::Laser => {
            canvas.fill_circle(pupil, 2.5, LASER_COLOR);
            canvas.stroke_line(
                pupil,
                Vec2::new(pupil.x + shift * 3.0, pupil.y + 14.0),
                1.0,
                with_alpha(LASER_COLOR, 150),
            );
        }
    }
}

fn draw_mouth(canvas: &mut Canvas<'_>, mouth: MouthType, lift: f32) {
    let center = Vec2::new(0.0, -20.0 + lift);
    match mouth {
        MouthType::Smile => canvas.stroke_arc(center, 6.0, 0.2, PI - 0.2, 1.0, INK),
        MouthType::Mask => canvas.fill_rect(-10.0, -24.0 + lift, 20.0, 8.0, MASK_COLOR),
        MouthType::Cigar => {
            canvas.stroke_arc(center, 5.0, 0.3, PI - 0.3, 1.0, INK);
            canvas.fill_rect(3.0, center.y + 3.0, 11.0, 2.5, CIGAR_COLOR);
            canvas.fill_rect(14.0, center.y + 3.0, 2.0, 2.5, EMBER_COLOR);
        }
        MouthType::Tentacles => {
            for offset in [-5.0f32, 0.0, 5.0] {
                let strand = [
                    Vec2::new(offset, center.y + 2.0),
                    Vec2::new(offset - 1.5, center.y + 5.0),
                    Vec2::new(offset + 1.5, center.y + 8.0),
                    Vec2::new(offset, center.y + 11.0),
                ];
                canvas.stroke_polyline(&strand, 2.0, TENTACLE_COLOR, None);
            }
        }
        MouthType::Teeth => {
            canvas.fill_rect(-7.0, center.y + 1.0, 14.0, 5.0, TEETH_COLOR);
            for gap in [-3.5f32, 0.0, 3.5] {
                canvas.fill_rect(gap - 0.4, center.y + 1.0, 0.8, 5.0, INK);
            }
        }
    }
}

fn draw_shirt(canvas: &mut Canvas<'_>, agent: &Agent, lift: f32) {
    let top = -15.0 + lift;
    let text = agent.traits.shirt_text.as_deref().unwrap_or("");
    match agent.traits.shirt {
        ShirtStyle::Plain => canvas.fill_rect(-12.0, top, 24.0, 7.0, shade(agent.color, 0.85)),
        ShirtStyle::Striped => {
            let mut x = -12.0;
            while x < 12.0 {
                canvas.fill_rect(x, top, 3.0, 7.0, STRIPE_SHADE);
                x += 6.0;
            }
        }
        ShirtStyle::Logo => {
            canvas.fill_rect(-7.0, top, 14.0, 7.0, LOGO_PLATE);
            if !text.is_empty() {
                canvas.fill_text_centered(text, 0.0, top + 1.0, 1.0, SHIRT_TEXT_COLOR);
            }
        }
        ShirtStyle::Jersey => {
            canvas.fill_rect(-12.0, top, 24.0, 7.0, JERSEY_COLOR);
            if !text.is_empty() {
                canvas.fill_text_centered(text, 0.0, top + 1.0, 1.0, JERSEY_TEXT_COLOR);
            }
        }
        ShirtStyle::Suit => {
            canvas.fill_rect(-12.0, top, 24.0, 7.0, SUIT_COLOR);
            canvas.fill_triangle(
                Vec2::new(-4.0, top),
                Vec2::new(4.0, top),
                Vec2::new(0.0, top + 5.0),
                LOGO_PLATE,
            );
            canvas.fill_rect(-1.0, top + 1.0, 2.0, 5.0, TIE_COLOR);
        }
    }
}

fn draw_accessory(canvas: &mut Canvas<'_>, accessory: Accessory, lift: f32) {
    match accessory {
        Accessory::None => {}
        Accessory::Hat => {
            canvas.fill_rect(-16.0, -40.0 + lift, 32.0, 4.0, HAT_COLOR);
            canvas.fill_rect(-10.0, -52.0 + lift, 20.0, 12.0, HAT_COLOR);
            canvas.fill_rect(-10.0, -44.0 + lift, 20.0, 2.0, HAT_BAND);
        }
        Accessory::Shades => {
            canvas.fill_rect(-14.0, -35.0 + lift, 11.0, 6.0, SHADES_COLOR);
            canvas.fill_rect(3.0, -35.0 + lift, 11.0, 6.0, SHADES_COLOR);
            canvas.stroke_line(
                Vec2::new(-3.0, -33.0 + lift),
                Vec2::new(3.0, -33.0 + lift),
                1.5,
                SHADES_COLOR,
            );
        }
        Accessory::Chain => {
            canvas.stroke_arc(Vec2::new(0.0, -22.0 + lift), 9.0, 0.35, PI - 0.35, 2.0, CHAIN_COLOR);
            canvas.fill_circle(Vec2::new(0.0, -12.5 + lift), 2.5, CHAIN_COLOR);
        }
        Accessory::Halo => {
            canvas.stroke_arc(Vec2::new(0.0, -48.0 + lift), 9.0, 0.0, TAU, 2.0, HALO_COLOR);
        }
    }
}

fn draw_name_tag(canvas: &mut Canvas<'_>, agent: &Agent, top: f32, cell: f32) {
    let size = canvas.measure_text(&agent.name, cell);
    let dot = cell * 2.0;
    let width = size.x + dot * 2.0 + cell;
    let left = -width * 0.5;
    canvas.fill_rect(left - cell, top - cell, width + cell * 2.0, size.y + cell * 2.0, NAME_TAG_PLATE);
    canvas.fill_circle(
        Vec2::new(left + dot, top + size.y * 0.5),
        dot * 0.8,
        agent.emotional_state.color(),
    );
    canvas.fill_text(&agent.name, Vec2::new(left + dot * 2.0 + cell, top), cell, NAME_TAG_TEXT);
}

fn shade(color: Rgba, factor: f32) -> Rgba {
    let scale = |channel: u8| (channel as f32 * factor).clamp(0.0, 255.0) as u8;
    [scale(color[0]), scale(color[1]), scale(color[2]), color[3]]
}
