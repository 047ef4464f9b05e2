// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Accumulates figures into SVG path data.

use kurbo::{BezPath, PathEl, Point};

use crate::fmt::push_num;

/// One contiguous sub-path.
#[derive(Clone, Debug, Default)]
struct Figure {
    data: String,
    start: Point,
    current: Point,
    points: usize,
}

impl Figure {
    fn begin(&mut self, p: Point) {
        self.data.push_str("M ");
        push_point(&mut self.data, p);
        self.start = p;
        self.current = p;
        self.points = 1;
    }
}

/// The current path of an SVG context, as a list of figures.
///
/// Serializes to `M`, `L`, `C` and `Z` commands, each followed by a space.
#[derive(Clone, Debug, Default)]
pub(crate) struct PathData {
    done: Vec<String>,
    figure: Figure,
}

impl PathData {
    pub(crate) fn move_to(&mut self, p: Point) {
        self.flush();
        self.figure.begin(p);
    }

    /// On an empty figure this only sets the start point.
    pub(crate) fn line_to(&mut self, p: Point) {
        if self.figure.points == 0 {
            self.figure.begin(p);
            return;
        }
        self.figure.data.push_str("L ");
        push_point(&mut self.figure.data, p);
        self.figure.current = p;
        self.figure.points += 1;
    }

    pub(crate) fn cubic_to(&mut self, p1: Point, p2: Point, p3: Point) {
        if self.figure.points == 0 {
            self.figure.begin(p1);
        }
        self.figure.data.push_str("C ");
        for p in [p1, p2, p3] {
            push_point(&mut self.figure.data, p);
        }
        self.figure.current = p3;
        self.figure.points += 3;
    }

    /// Closes the current figure. A no-op on an empty figure.
    pub(crate) fn close(&mut self) {
        if self.figure.points == 0 {
            return;
        }
        self.figure.data.push_str("Z ");
        self.figure.current = self.figure.start;
        self.flush();
    }

    /// Appends every element of `path`, raising quadratic segments to cubics.
    pub(crate) fn extend(&mut self, path: &BezPath) {
        for el in path.elements() {
            match *el {
                PathEl::MoveTo(p) => self.move_to(p),
                PathEl::LineTo(p) => self.line_to(p),
                PathEl::QuadTo(p1, p2) => {
                    let cubic = kurbo::QuadBez::new(self.figure.current, p1, p2).raise();
                    self.cubic_to(cubic.p1, cubic.p2, cubic.p3);
                }
                PathEl::CurveTo(p1, p2, p3) => self.cubic_to(p1, p2, p3),
                PathEl::ClosePath => self.close(),
            }
        }
    }

    pub(crate) fn clear(&mut self) {
        *self = Self::default();
    }

    /// Takes the accumulated data, leaving the path empty.
    pub(crate) fn take(&mut self) -> String {
        self.flush();
        let data = self.done.concat();
        self.clear();
        data
    }

    fn flush(&mut self) {
        if self.figure.points > 0 {
            let figure = core::mem::take(&mut self.figure);
            self.done.push(figure.data);
        }
    }
}

fn push_point(out: &mut String, p: Point) {
    push_num(out, p.x);
    out.push(' ');
    push_num(out, p.y);
    out.push(' ');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_serializes_with_trailing_spaces() {
        let mut path = PathData::default();
        path.move_to(Point::new(10.0, 30.0));
        path.line_to(Point::new(90.0, 30.0));
        assert_eq!(path.take(), "M 10 30 L 90 30 ");
        assert_eq!(path.take(), "");
    }

    #[test]
    fn close_is_idempotent() {
        let mut path = PathData::default();
        path.move_to(Point::new(0.0, 0.0));
        path.line_to(Point::new(5.0, 0.0));
        path.line_to(Point::new(5.0, 5.0));
        path.close();
        path.close();
        path.close();
        assert_eq!(path.take(), "M 0 0 L 5 0 L 5 5 Z ");
    }

    #[test]
    fn line_on_empty_figure_starts_it() {
        let mut path = PathData::default();
        path.line_to(Point::new(1.0, 2.0));
        path.line_to(Point::new(3.0, 4.0));
        path.close();
        path.line_to(Point::new(7.0, 8.0));
        path.cubic_to(
            Point::new(1.0, 1.0),
            Point::new(2.0, 2.0),
            Point::new(3.5, 3.0),
        );
        assert_eq!(
            path.take(),
            "M 1 2 L 3 4 Z M 7 8 C 1 1 2 2 3.5 3 "
        );
    }

    #[test]
    fn lone_move_is_kept() {
        let mut path = PathData::default();
        path.move_to(Point::new(1.0, 1.0));
        path.move_to(Point::new(2.0, 2.0));
        path.line_to(Point::new(3.0, 3.0));
        assert_eq!(path.take(), "M 1 1 M 2 2 L 3 3 ");
    }

    #[test]
    fn quads_are_raised_to_cubics() {
        let mut bez = BezPath::new();
        bez.move_to((0.0, 0.0));
        bez.quad_to((3.0, 3.0), (6.0, 0.0));
        let mut path = PathData::default();
        path.extend(&bez);
        assert_eq!(path.take(), "M 0 0 C 2 2 4 2 6 0 ");
    }
}
