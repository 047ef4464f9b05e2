// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Number, color and transform formatting for SVG attributes.
//!
//! Rust formatting never consults the host locale, so every number written
//! here uses `.` as the decimal separator.

use core::fmt::Write as _;

use kurbo::Affine;
use peniko::Color;

/// Decimal places kept in emitted numbers.
const PRECISION: f64 = 10_000.0;

/// Formats `v` with at most four decimals, trailing zeros trimmed.
///
/// Negative zero prints as `0`. Non-finite values are written as is.
pub(crate) fn num(v: f64) -> String {
    let mut out = String::new();
    push_num(&mut out, v);
    out
}

/// Appends `v` to `out`, formatted as by [`num`].
pub(crate) fn push_num(out: &mut String, v: f64) {
    if !v.is_finite() {
        let _ = write!(out, "{v}");
        return;
    }
    let rounded = (v * PRECISION).round() / PRECISION;
    if rounded == 0.0 {
        out.push('0');
        return;
    }
    if rounded.fract() == 0.0 && rounded.abs() < 1e15 {
        #[allow(
            clippy::cast_possible_truncation,
            reason = "integral and within i64 range"
        )]
        let int = rounded as i64;
        let _ = write!(out, "{int}");
        return;
    }
    let start = out.len();
    let _ = write!(out, "{rounded:.4}");
    while out.len() > start && out.ends_with('0') {
        out.pop();
    }
    if out.ends_with('.') {
        out.pop();
    }
}

/// Space-separated numbers.
pub(crate) fn nums(values: impl IntoIterator<Item = f64>) -> String {
    let mut out = String::new();
    for (i, v) in values.into_iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        push_num(&mut out, v);
    }
    out
}

/// `matrix(a b c d e f)`.
pub(crate) fn matrix(xf: Affine) -> String {
    // kurbo stores [a, b, c, d, e, f] for
    // [ a c e ]
    // [ b d f ]
    format!("matrix({})", nums(xf.as_coeffs()))
}

/// Parses a `matrix(a b c d e f)` attribute written by [`matrix`].
pub(crate) fn parse_matrix(value: &str) -> Option<Affine> {
    let inner = value.trim().strip_prefix("matrix(")?.strip_suffix(')')?;
    let mut coeffs = [0.0; 6];
    let mut parts = inner.split([' ', ',']).filter(|s| !s.is_empty());
    for c in &mut coeffs {
        *c = parts.next()?.parse().ok()?;
    }
    parts.next().is_none().then(|| Affine::new(coeffs))
}

/// `#rrggbb` and the alpha channel in `0..=1`.
pub(crate) fn color(color: Color) -> (String, f32) {
    let rgba = color.to_rgba8();
    let a = f32::from(rgba.a) / 255.0;
    (format!("#{:02x}{:02x}{:02x}", rgba.r, rgba.g, rgba.b), a)
}

/// A duration in milliseconds as an SVG clock value in seconds.
pub(crate) fn seconds(ms: f64) -> String {
    format!("{}s", num(ms / 1000.0))
}

/// Angle in radians as degrees.
pub(crate) fn degrees(radians: f64) -> String {
    num(radians.to_degrees())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_are_trimmed_and_locale_free() {
        assert_eq!(num(10.0), "10");
        assert_eq!(num(0.5), "0.5");
        assert_eq!(num(1.0 / 3.0), "0.3333");
        assert_eq!(num(-2.25), "-2.25");
        assert_eq!(num(-0.0), "0");
        assert_eq!(num(-0.000_01), "0");
        assert_eq!(num(1234.5678), "1234.5678");
        assert!(!num(1234.5678).contains(','));
    }

    #[test]
    fn non_finite_values_propagate() {
        assert_eq!(num(f64::NAN), "NaN");
        assert_eq!(num(f64::INFINITY), "inf");
    }

    #[test]
    fn matrix_round_trips() {
        let xf = Affine::new([1.0, 0.5, -0.5, 2.0, 10.0, 20.25]);
        let text = matrix(xf);
        assert_eq!(text, "matrix(1 0.5 -0.5 2 10 20.25)");
        assert_eq!(parse_matrix(&text), Some(xf));
        assert_eq!(parse_matrix("translate(1 2)"), None);
    }

    #[test]
    fn colors_split_alpha() {
        let (rgb, a) = color(Color::from_rgba8(255, 0, 16, 51));
        assert_eq!(rgb, "#ff0010");
        assert!((a - 0.2).abs() < 1e-6, "{a}");
    }

    #[test]
    fn clock_values() {
        assert_eq!(seconds(1200.0), "1.2s");
        assert_eq!(degrees(core::f64::consts::FRAC_PI_2), "90");
    }
}
