// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Affine matrix utilities.
//!
//! Transforms are [`kurbo::Affine`] values, i.e. the 3×3 homogeneous matrix
//!
//! ```text
//! [ a c e ]
//! [ b d f ]
//! [ 0 0 1 ]
//! ```
//!
//! stored as `[a, b, c, d, e, f]`. The helpers here compose by
//! right-multiplication, so `translate(m, ..)` yields `m * T`: the new
//! transform applies first to incoming points, then `m`.
//!
//! Singular matrices are not rejected. [`invert`] divides by the
//! determinant and lets NaN or infinity propagate; use [`try_invert`] when
//! the caller wants to guard.

use kurbo::{Affine, Point, Vec2};

/// Matrix product `m * n`.
#[inline]
pub fn multiply(m: Affine, n: Affine) -> Affine {
    m * n
}

/// Applies `m` to a point.
#[inline]
pub fn apply(m: Affine, p: Point) -> Point {
    m * p
}

/// Returns `m * translate(tx, ty)`.
#[inline]
pub fn translate(m: Affine, tx: f64, ty: f64) -> Affine {
    m * Affine::translate((tx, ty))
}

/// Returns `m * rotate(radians)`.
#[inline]
pub fn rotate(m: Affine, radians: f64) -> Affine {
    m * Affine::rotate(radians)
}

/// Returns `m * scale(sx, sy)`.
#[inline]
pub fn scale(m: Affine, sx: f64, sy: f64) -> Affine {
    m * Affine::scale_non_uniform(sx, sy)
}

/// Determinant of the linear part.
#[inline]
pub fn determinant(m: Affine) -> f64 {
    let [a, b, c, d, _, _] = m.as_coeffs();
    a * d - b * c
}

/// Closed-form cofactor inverse.
///
/// A singular `m` produces non-finite coefficients.
pub fn invert(m: Affine) -> Affine {
    let [a, b, c, d, e, f] = m.as_coeffs();
    let det = a * d - b * c;
    Affine::new([
        d / det,
        -b / det,
        -c / det,
        a / det,
        (c * f - d * e) / det,
        (b * e - a * f) / det,
    ])
}

/// Like [`invert`], but returns `None` when the result would not be finite.
pub fn try_invert(m: Affine) -> Option<Affine> {
    let det = determinant(m);
    if det == 0.0 || !det.is_finite() {
        return None;
    }
    let inv = invert(m);
    inv.is_finite().then_some(inv)
}

/// Geometric mean of the axis scale factors, `sqrt(|det|)`.
#[inline]
pub fn uniform_scale(m: Affine) -> f64 {
    determinant(m).abs().sqrt()
}

/// An affine transform split into components.
///
/// Recomposes as `translate * rotate * scale * skewX * skewY`, which is also
/// the order SVG applies a `transform` list in.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Decomposition {
    /// Translation.
    pub translation: Vec2,
    /// Rotation in radians.
    pub rotation: f64,
    /// Scale along x and y.
    pub scale: Vec2,
    /// Skew angles in radians, `x` for `skewX` and `y` for `skewY`.
    pub skew: Vec2,
}

impl Decomposition {
    /// The identity decomposition.
    pub const IDENTITY: Self = Self {
        translation: Vec2::ZERO,
        rotation: 0.0,
        scale: Vec2::new(1.0, 1.0),
        skew: Vec2::ZERO,
    };

    /// Rebuilds the matrix.
    pub fn to_affine(&self) -> Affine {
        Affine::translate(self.translation)
            * Affine::rotate(self.rotation)
            * Affine::scale_non_uniform(self.scale.x, self.scale.y)
            * Affine::skew(self.skew.x.tan(), 0.0)
            * Affine::skew(0.0, self.skew.y.tan())
    }

    /// Component-wise linear interpolation.
    ///
    /// Rotation takes the shorter way round.
    pub fn lerp(&self, other: &Self, t: f64) -> Self {
        let mut delta = other.rotation - self.rotation;
        if delta > core::f64::consts::PI {
            delta -= core::f64::consts::TAU;
        } else if delta < -core::f64::consts::PI {
            delta += core::f64::consts::TAU;
        }
        Self {
            translation: self.translation.lerp(other.translation, t),
            rotation: self.rotation + delta * t,
            scale: self.scale.lerp(other.scale, t),
            skew: self.skew.lerp(other.skew, t),
        }
    }
}

/// Splits `m` into translation, rotation, scale and skew.
///
/// The rotation comes from the first column when it is nonzero, leaving any
/// shear in `skew.x`. A matrix whose first column is zero takes its rotation
/// from the second column instead. The zero matrix decomposes to zero
/// rotation, zero scale and zero skew.
pub fn decompose(m: Affine) -> Decomposition {
    let [a, b, c, d, e, f] = m.as_coeffs();
    let translation = Vec2::new(e, f);
    let delta = a * d - b * c;

    if a != 0.0 || b != 0.0 {
        let r = a.hypot(b);
        Decomposition {
            translation,
            rotation: b.atan2(a),
            scale: Vec2::new(r, delta / r),
            skew: Vec2::new(((a * c + b * d) / (r * r)).atan(), 0.0),
        }
    } else if c != 0.0 || d != 0.0 {
        let s = c.hypot(d);
        Decomposition {
            translation,
            rotation: (-c).atan2(d),
            scale: Vec2::new(0.0, s),
            skew: Vec2::ZERO,
        }
    } else {
        Decomposition {
            translation,
            rotation: 0.0,
            scale: Vec2::ZERO,
            skew: Vec2::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_affine_near(a: Affine, b: Affine) {
        let (a, b) = (a.as_coeffs(), b.as_coeffs());
        for i in 0..6 {
            assert!((a[i] - b[i]).abs() < 1e-9, "coefficient {i}: {a:?} vs {b:?}");
        }
    }

    #[test]
    fn composition_order_is_current_times_new() {
        let m = translate(Affine::IDENTITY, 10.0, 0.0);
        let m = scale(m, 2.0, 2.0);
        // The scale applies first, then the translation.
        assert_eq!(apply(m, Point::new(1.0, 1.0)), Point::new(12.0, 2.0));
        assert_eq!(multiply(Affine::IDENTITY, m), m);
    }

    #[test]
    fn invert_round_trips() {
        let m = Affine::new([2.0, 0.5, -1.0, 3.0, 7.0, -4.0]);
        assert_affine_near(m * invert(m), Affine::IDENTITY);
        assert!(try_invert(m).is_some());
    }

    #[test]
    fn singular_inverse_is_not_finite() {
        let m = Affine::new([1.0, 2.0, 2.0, 4.0, 0.0, 0.0]);
        assert!(!invert(m).is_finite());
        assert!(try_invert(m).is_none());
    }

    #[test]
    fn decompose_recomposes() {
        let cases = [
            Affine::IDENTITY,
            Affine::translate((5.0, -3.0)),
            Affine::rotate(0.7),
            Affine::scale_non_uniform(2.0, -3.0),
            Affine::new([1.0, 0.0, 0.5, 1.0, 0.0, 0.0]),
            Affine::new([0.3, -1.2, 2.5, 0.8, 10.0, 20.0]),
            Affine::new([0.0, 0.0, 2.0, 1.0, 3.0, 4.0]),
            Affine::new([0.0, 0.0, 0.0, -2.0, 0.0, 0.0]),
        ];
        for m in cases {
            assert_affine_near(decompose(m).to_affine(), m);
        }
    }

    #[test]
    fn decompose_pure_components() {
        let d = decompose(Affine::translate((3.0, 4.0)) * Affine::rotate(0.5));
        assert!((d.rotation - 0.5).abs() < 1e-12, "rotation {}", d.rotation);
        assert_eq!(d.translation, Vec2::new(3.0, 4.0));
        assert!((d.scale.x - 1.0).abs() < 1e-12, "scale {:?}", d.scale);
        assert!(d.skew.x.abs() < 1e-12, "skew {:?}", d.skew);
    }

    #[test]
    fn zero_matrix_has_zero_skew() {
        let d = decompose(Affine::new([0.0; 6]));
        assert_eq!(d.skew, Vec2::ZERO);
        assert_eq!(d.rotation, 0.0);
        assert_eq!(d.scale, Vec2::ZERO);
        assert_affine_near(d.to_affine(), Affine::new([0.0; 6]));
    }

    #[test]
    fn lerp_takes_short_rotation() {
        let a = Decomposition {
            rotation: 3.0,
            ..Decomposition::IDENTITY
        };
        let b = Decomposition {
            rotation: -3.0,
            ..Decomposition::IDENTITY
        };
        let mid = a.lerp(&b, 0.5);
        assert!(mid.rotation.abs() > 3.0, "rotation {}", mid.rotation);
    }
}
