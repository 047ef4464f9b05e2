// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Frame-based animations.
//!
//! An [`Animation`] is a sequence of [`Frame`]s, each a static [`Graphics`]
//! held for a duration, with a [`Transition`] between consecutive frames.
//! The timeline is
//!
//! ```text
//! frame 0 | transition 0 | frame 1 | transition 1 | ... | frame n-1
//! ```
//!
//! During a transition, content is interpolated between the two frames
//! with [`Graphics::interpolate`]; tagged items may use their own easing.
//! All durations are in milliseconds.

use std::collections::HashMap;
use std::sync::Arc;

use crate::graphics::Graphics;

/// Timing curve of a transition.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Easing {
    /// Constant speed.
    #[default]
    Linear,
    /// CSS-style `cubic-bezier(x1, y1, x2, y2)`.
    Spline {
        /// First control point, x.
        x1: f64,
        /// First control point, y.
        y1: f64,
        /// Second control point, x.
        x2: f64,
        /// Second control point, y.
        y2: f64,
    },
}

impl Easing {
    /// `cubic-bezier(0.42, 0, 0.58, 1)`.
    pub const EASE_IN_OUT: Self = Self::Spline {
        x1: 0.42,
        y1: 0.0,
        x2: 0.58,
        y2: 1.0,
    };

    /// Control points `[x1, y1, x2, y2]`; linear is `[0, 0, 1, 1]`.
    pub fn control_points(&self) -> [f64; 4] {
        match *self {
            Self::Linear => [0.0, 0.0, 1.0, 1.0],
            Self::Spline { x1, y1, x2, y2 } => [x1, y1, x2, y2],
        }
    }

    /// Maps linear progress in `0..=1` to eased progress.
    pub fn apply(&self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match *self {
            Self::Linear => t,
            Self::Spline { x1, y1, x2, y2 } => {
                if t <= 0.0 || t >= 1.0 {
                    return t;
                }
                bezier(y1, y2, solve_bezier_x(x1, x2, t))
            }
        }
    }
}

fn bezier(p1: f64, p2: f64, t: f64) -> f64 {
    let mt = 1.0 - t;
    3.0 * mt * mt * t * p1 + 3.0 * mt * t * t * p2 + t * t * t
}

fn bezier_derivative(p1: f64, p2: f64, t: f64) -> f64 {
    let mt = 1.0 - t;
    3.0 * mt * mt * p1 + 6.0 * mt * t * (p2 - p1) + 3.0 * t * t * (1.0 - p2)
}

/// Finds the curve parameter whose x is `target`.
///
/// Newton-Raphson first; bisection if it stalls on a flat slope.
fn solve_bezier_x(x1: f64, x2: f64, target: f64) -> f64 {
    let mut t = target;
    for _ in 0..8 {
        let err = bezier(x1, x2, t) - target;
        if err.abs() < 1e-7 {
            return t;
        }
        let slope = bezier_derivative(x1, x2, t);
        if slope.abs() < 1e-7 {
            break;
        }
        t = (t - err / slope).clamp(0.0, 1.0);
    }
    let (mut lo, mut hi) = (0.0, 1.0);
    t = target;
    for _ in 0..40 {
        let x = bezier(x1, x2, t);
        if (x - target).abs() < 1e-7 {
            break;
        }
        if x < target {
            lo = t;
        } else {
            hi = t;
        }
        t = (lo + hi) * 0.5;
    }
    t
}

/// A static drawing shown for a while.
#[derive(Clone, Debug)]
pub struct Frame {
    /// Content.
    pub graphics: Arc<Graphics>,
    /// How long the frame is held, in milliseconds.
    pub duration: f64,
}

impl Frame {
    /// Creates a frame.
    pub fn new(graphics: impl Into<Arc<Graphics>>, duration: f64) -> Self {
        Self {
            graphics: graphics.into(),
            duration,
        }
    }
}

/// The blend between two consecutive frames.
#[derive(Clone, Debug, Default)]
pub struct Transition {
    /// Duration in milliseconds; zero cuts straight to the next frame.
    pub duration: f64,
    /// Easing for items without their own.
    pub easing: Easing,
    /// Per-tag easing overrides.
    pub tag_easings: HashMap<String, Easing>,
}

impl Transition {
    /// A transition with one easing for everything.
    pub fn new(duration: f64, easing: Easing) -> Self {
        Self {
            duration,
            easing,
            tag_easings: HashMap::new(),
        }
    }

    /// Adds an easing override for `tag`.
    #[must_use]
    pub fn with_tag_easing(mut self, tag: impl Into<String>, easing: Easing) -> Self {
        self.tag_easings.insert(tag.into(), easing);
        self
    }

    /// Easing for an item with `tag`.
    pub fn easing_for(&self, tag: Option<&str>) -> &Easing {
        tag.and_then(|t| self.tag_easings.get(t))
            .unwrap_or(&self.easing)
    }
}

/// Where a point in time falls on the timeline.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum TimelinePosition {
    /// Inside frame `index`.
    Frame(usize),
    /// Inside the transition from frame `index` to `index + 1`, at linear
    /// `progress` in `0..=1`.
    Transition {
        /// Transition index.
        index: usize,
        /// Linear progress.
        progress: f64,
    },
}

/// A sequence of frames and transitions.
#[derive(Clone, Debug)]
pub struct Animation {
    /// Canvas width.
    pub width: f64,
    /// Canvas height.
    pub height: f64,
    frames: Vec<Frame>,
    transitions: Vec<Transition>,
}

impl Animation {
    /// An empty animation on a `width` × `height` canvas.
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            frames: Vec::new(),
            transitions: Vec::new(),
        }
    }

    /// Appends a frame, cutting to it without a transition.
    pub fn add_frame(&mut self, frame: Frame) {
        self.add_frame_with_transition(Transition::default(), frame);
    }

    /// Appends a frame, blending to it from the previous one with
    /// `transition`. The transition is ignored for the first frame.
    pub fn add_frame_with_transition(&mut self, transition: Transition, frame: Frame) {
        if !self.frames.is_empty() {
            self.transitions.push(transition);
        }
        self.frames.push(frame);
    }

    /// Frames in order.
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Transitions; entry `i` runs between frames `i` and `i + 1`.
    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// Length of the whole timeline.
    pub fn total_duration(&self) -> f64 {
        self.frames.iter().map(|f| f.duration).sum::<f64>()
            + self.transitions.iter().map(|t| t.duration).sum::<f64>()
    }

    /// Start time of frame `index`.
    pub fn frame_start(&self, index: usize) -> f64 {
        self.frames[..index].iter().map(|f| f.duration).sum::<f64>()
            + self.transitions[..index.min(self.transitions.len())]
                .iter()
                .map(|t| t.duration)
                .sum::<f64>()
    }

    /// Start time of transition `index`.
    pub fn transition_start(&self, index: usize) -> f64 {
        self.frame_start(index) + self.frames[index].duration
    }

    /// Locates `time` on the timeline, clamping to its ends.
    pub fn position_at(&self, time: f64) -> Option<TimelinePosition> {
        if self.frames.is_empty() {
            return None;
        }
        let mut start = 0.0;
        for (index, frame) in self.frames.iter().enumerate() {
            start += frame.duration;
            if time < start {
                return Some(TimelinePosition::Frame(index));
            }
            if let Some(transition) = self.transitions.get(index) {
                if transition.duration > 0.0 && time < start + transition.duration {
                    return Some(TimelinePosition::Transition {
                        index,
                        progress: (time - start) / transition.duration,
                    });
                }
                start += transition.duration;
            }
        }
        Some(TimelinePosition::Frame(self.frames.len() - 1))
    }

    /// Content shown at `time`.
    pub fn graphics_at(&self, time: f64) -> Option<Arc<Graphics>> {
        Some(match self.position_at(time)? {
            TimelinePosition::Frame(index) => self.frames[index].graphics.clone(),
            TimelinePosition::Transition { index, progress } => {
                let transition = &self.transitions[index];
                Arc::new(Graphics::interpolate(
                    &self.frames[index].graphics,
                    &self.frames[index + 1].graphics,
                    |tag| transition.easing_for(tag).apply(progress),
                ))
            }
        })
    }
}
