//! Planar geometry in PDF points
//!
//! `Rect` describes page boxes, `Matrix` describes content-space
//! transformations using the PDF `[a b c d e f]` convention, where a point
//! maps as `x' = a·x + c·y + e`, `y' = b·x + d·y + f`.

use crate::constants::GEOMETRY_EPSILON;

/// A rectangular area in points
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    /// X position (left edge)
    pub x: f32,
    /// Y position (bottom edge)
    pub y: f32,
    /// Width
    pub width: f32,
    /// Height
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle anchored at the origin
    pub fn from_size(width: f32, height: f32) -> Self {
        Self::new(0.0, 0.0, width, height)
    }

    /// Build from lower-left and upper-right corners, normalizing inverted input
    pub fn from_corners(lower_left: (f32, f32), upper_right: (f32, f32)) -> Self {
        let x = lower_left.0.min(upper_right.0);
        let y = lower_left.1.min(upper_right.1);
        Self::new(
            x,
            y,
            (upper_right.0 - lower_left.0).abs(),
            (upper_right.1 - lower_left.1).abs(),
        )
    }

    /// Right edge x coordinate
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Top edge y coordinate
    pub fn top(&self) -> f32 {
        self.y + self.height
    }

    pub fn lower_left(&self) -> (f32, f32) {
        (self.x, self.y)
    }

    pub fn upper_right(&self) -> (f32, f32) {
        (self.right(), self.top())
    }

    /// Width exceeds height
    pub fn is_landscape(&self) -> bool {
        self.width > self.height
    }

    /// Compare dimensions within the geometry tolerance
    pub fn same_size(&self, width: f32, height: f32) -> bool {
        (self.width - width).abs() < GEOMETRY_EPSILON && (self.height - height).abs() < GEOMETRY_EPSILON
    }

    /// PDF array order: `[llx lly urx ury]`
    pub fn to_array(&self) -> [f32; 4] {
        [self.x, self.y, self.right(), self.top()]
    }
}

/// An affine transformation matrix
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    pub fn new(a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub fn translate(tx: f32, ty: f32) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    pub fn scale(sx: f32, sy: f32) -> Self {
        Self::new(sx, 0.0, 0.0, sy, 0.0, 0.0)
    }

    /// Counter-clockwise rotation about the origin.
    ///
    /// Quarter turns produce exact coefficients so repeated rotations do not
    /// accumulate rounding noise.
    pub fn rotate(degrees: i32) -> Self {
        match degrees.rem_euclid(360) {
            0 => Self::IDENTITY,
            90 => Self::new(0.0, 1.0, -1.0, 0.0, 0.0, 0.0),
            180 => Self::new(-1.0, 0.0, 0.0, -1.0, 0.0, 0.0),
            270 => Self::new(0.0, -1.0, 1.0, 0.0, 0.0, 0.0),
            other => {
                let (sin, cos) = (other as f32).to_radians().sin_cos();
                Self::new(cos, sin, -sin, cos, 0.0, 0.0)
            }
        }
    }

    /// The transformation that applies `self` first and `next` second.
    pub fn then(&self, next: &Matrix) -> Matrix {
        Matrix {
            a: self.a * next.a + self.b * next.c,
            b: self.a * next.b + self.b * next.d,
            c: self.c * next.a + self.d * next.c,
            d: self.c * next.b + self.d * next.d,
            e: self.e * next.a + self.f * next.c + next.e,
            f: self.e * next.b + self.f * next.d + next.f,
        }
    }

    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// Operand string for a `cm` operator
    pub fn to_operands(&self) -> String {
        format!(
            "{} {} {} {} {} {}",
            self.a, self.b, self.c, self.d, self.e, self.f
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotate_then_translate_keeps_quadrant() {
        // 90° on a 612x792 page, translated by (height, 0)
        let m = Matrix::rotate(90).then(&Matrix::translate(792.0, 0.0));
        assert_eq!(m.apply(0.0, 0.0), (792.0, 0.0));
        assert_eq!(m.apply(612.0, 792.0), (0.0, 612.0));
    }

    #[test]
    fn composition_order() {
        let m = Matrix::scale(2.0, 2.0).then(&Matrix::translate(10.0, 5.0));
        assert_eq!(m.apply(1.0, 1.0), (12.0, 7.0));

        let m = Matrix::translate(10.0, 5.0).then(&Matrix::scale(2.0, 2.0));
        assert_eq!(m.apply(1.0, 1.0), (22.0, 12.0));
    }

    #[test]
    fn full_turn_is_identity() {
        let m = Matrix::rotate(90)
            .then(&Matrix::rotate(90))
            .then(&Matrix::rotate(180));
        assert!(m.is_identity());
    }

    #[test]
    fn rect_corners() {
        let r = Rect::from_corners((10.0, 20.0), (110.0, 70.0));
        assert_eq!(r, Rect::new(10.0, 20.0, 100.0, 50.0));
        assert_eq!(r.to_array(), [10.0, 20.0, 110.0, 70.0]);
        assert!(r.is_landscape());
    }
}
