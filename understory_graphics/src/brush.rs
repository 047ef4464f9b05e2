// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Paint sources.

use std::sync::Arc;

use kurbo::{Affine, Point};
use peniko::Color;

/// A color stop of a gradient.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GradientStop {
    /// Position along the gradient in `0..=1`.
    pub offset: f32,
    /// Color at this stop, including opacity.
    pub color: Color,
}

impl GradientStop {
    /// Creates a stop.
    pub const fn new(offset: f32, color: Color) -> Self {
        Self { offset, color }
    }
}

/// A gradient along the line from `start` to `end`.
#[derive(Clone, Debug, PartialEq)]
pub struct LinearGradient {
    /// Start point, where offset 0 lies.
    pub start: Point,
    /// End point, where offset 1 lies.
    pub end: Point,
    /// Stops in ascending offset order.
    pub stops: Vec<GradientStop>,
    /// Extra transform applied to the gradient geometry.
    pub transform: Option<Affine>,
}

/// A radial gradient from `focus` out to the circle at `center`.
#[derive(Clone, Debug, PartialEq)]
pub struct RadialGradient {
    /// Center of the end circle.
    pub center: Point,
    /// Focal point, where offset 0 lies.
    pub focus: Point,
    /// Radius of the end circle.
    pub radius: f64,
    /// Stops in ascending offset order.
    pub stops: Vec<GradientStop>,
    /// Extra transform applied to the gradient geometry.
    pub transform: Option<Affine>,
}

/// A paint source.
///
/// Gradients are reference counted. Backends that deduplicate gradient
/// definitions do so by *object identity* (see [`Brush::resource_key`]):
/// two separately constructed gradients with equal parameters stay distinct.
#[derive(Clone, Debug, PartialEq)]
pub enum Brush {
    /// A single color.
    Solid(Color),
    /// A linear gradient.
    Linear(Arc<LinearGradient>),
    /// A radial gradient.
    Radial(Arc<RadialGradient>),
}

impl Default for Brush {
    fn default() -> Self {
        Self::Solid(Color::BLACK)
    }
}

impl From<Color> for Brush {
    fn from(color: Color) -> Self {
        Self::Solid(color)
    }
}

impl From<LinearGradient> for Brush {
    fn from(gradient: LinearGradient) -> Self {
        Self::Linear(Arc::new(gradient))
    }
}

impl From<RadialGradient> for Brush {
    fn from(gradient: RadialGradient) -> Self {
        Self::Radial(Arc::new(gradient))
    }
}

impl Brush {
    /// Identity of the shared gradient object, or `None` for solid colors.
    pub fn resource_key(&self) -> Option<usize> {
        match self {
            Self::Solid(_) => None,
            Self::Linear(g) => Some(Arc::as_ptr(g) as usize),
            Self::Radial(g) => Some(Arc::as_ptr(g) as usize),
        }
    }

    /// Interpolates between two brushes.
    ///
    /// Solid colors blend in sRGB. Gradients of the same kind with the same
    /// number of stops blend geometry and stops; anything else switches over
    /// at the midpoint.
    pub fn lerp(&self, other: &Self, t: f64) -> Self {
        #[allow(
            clippy::cast_possible_truncation,
            reason = "color channels are f32"
        )]
        let tf = t as f32;
        match (self, other) {
            (Self::Solid(a), Self::Solid(b)) => Self::Solid(lerp_color(*a, *b, tf)),
            (Self::Linear(a), Self::Linear(b)) if a.stops.len() == b.stops.len() => {
                if Arc::ptr_eq(a, b) {
                    return self.clone();
                }
                Self::Linear(Arc::new(LinearGradient {
                    start: a.start.lerp(b.start, t),
                    end: a.end.lerp(b.end, t),
                    stops: lerp_stops(&a.stops, &b.stops, tf),
                    transform: if t < 0.5 { a.transform } else { b.transform },
                }))
            }
            (Self::Radial(a), Self::Radial(b)) if a.stops.len() == b.stops.len() => {
                if Arc::ptr_eq(a, b) {
                    return self.clone();
                }
                Self::Radial(Arc::new(RadialGradient {
                    center: a.center.lerp(b.center, t),
                    focus: a.focus.lerp(b.focus, t),
                    radius: a.radius + (b.radius - a.radius) * t,
                    stops: lerp_stops(&a.stops, &b.stops, tf),
                    transform: if t < 0.5 { a.transform } else { b.transform },
                }))
            }
            _ => {
                if t < 0.5 {
                    self.clone()
                } else {
                    other.clone()
                }
            }
        }
    }

    /// Converts into the equivalent `peniko` brush.
    pub fn to_peniko(&self) -> peniko::Brush {
        match self {
            Self::Solid(color) => peniko::Brush::Solid(*color),
            Self::Linear(g) => {
                let kind = peniko::GradientKind::Linear(peniko::LinearGradientPosition::new(
                    g.start, g.end,
                ));
                peniko::Brush::Gradient(peniko::Gradient {
                    kind,
                    stops: peniko_stops(&g.stops),
                    ..peniko::Gradient::default()
                })
            }
            Self::Radial(g) => {
                #[allow(
                    clippy::cast_possible_truncation,
                    reason = "peniko radii are f32"
                )]
                let radius = g.radius as f32;
                let kind = peniko::GradientKind::Radial(
                    peniko::RadialGradientPosition::new_two_point(g.focus, 0.0, g.center, radius),
                );
                peniko::Brush::Gradient(peniko::Gradient {
                    kind,
                    stops: peniko_stops(&g.stops),
                    ..peniko::Gradient::default()
                })
            }
        }
    }

    /// Gradient transform, if any.
    pub fn gradient_transform(&self) -> Option<Affine> {
        match self {
            Self::Solid(_) => None,
            Self::Linear(g) => g.transform,
            Self::Radial(g) => g.transform,
        }
    }
}

fn lerp_stops(a: &[GradientStop], b: &[GradientStop], t: f32) -> Vec<GradientStop> {
    a.iter()
        .zip(b)
        .map(|(a, b)| GradientStop {
            offset: a.offset + (b.offset - a.offset) * t,
            color: lerp_color(a.color, b.color, t),
        })
        .collect()
}

/// Blends two colors component-wise in sRGB.
pub fn lerp_color(a: Color, b: Color, t: f32) -> Color {
    let mut out = a.components;
    for (c, d) in out.iter_mut().zip(b.components) {
        *c += (d - *c) * t;
    }
    Color::new(out)
}

fn peniko_stops(stops: &[GradientStop]) -> peniko::ColorStops {
    let stops: Vec<peniko::ColorStop> = stops
        .iter()
        .map(|s| peniko::ColorStop::from((s.offset, s.color)))
        .collect();
    peniko::ColorStops::from(stops.as_slice())
}
