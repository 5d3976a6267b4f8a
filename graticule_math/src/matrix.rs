// Copyright 2026 the Graticule Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Column-major 4×4 double-precision matrix.
//!
//! This type covers the matrix algebra the node hierarchy actually needs
//! (TRS composition and decomposition, multiply, general inverse,
//! homogeneous point/vector transform) without pulling in a full
//! linear-algebra crate.

use core::ops::Mul;

use crate::quat::Quat;
use crate::vec::{Vec3d, Vec3f};

/// A column-major 4×4 matrix stored as `[[f64; 4]; 4]`.
///
/// Each inner array is one *column* of the matrix, matching the memory layout
/// used by GPU APIs. Matrices built by [`compose_trs`](Self::compose_trs)
/// carry `[0, 0, 0, 1]` in the bottom row; [`inverse`](Self::inverse)
/// preserves that up to floating-point error.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Matrix4d {
    /// Four columns, each a 4-element array `[x, y, z, w]`.
    pub cols: [[f64; 4]; 4],
}

impl Matrix4d {
    /// The 4×4 identity matrix.
    pub const IDENTITY: Self = Self {
        cols: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    /// Creates a matrix from four column arrays.
    #[inline]
    #[must_use]
    pub const fn from_cols(col0: [f64; 4], col1: [f64; 4], col2: [f64; 4], col3: [f64; 4]) -> Self {
        Self {
            cols: [col0, col1, col2, col3],
        }
    }

    /// Returns column `i` (0-based).
    ///
    /// # Panics
    ///
    /// Panics if `i >= 4`.
    #[inline]
    #[must_use]
    pub const fn col(self, i: usize) -> [f64; 4] {
        self.cols[i]
    }

    /// Creates a pure translation matrix.
    #[inline]
    #[must_use]
    pub const fn from_translation(v: Vec3d) -> Self {
        Self {
            cols: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [v.x, v.y, v.z, 1.0],
            ],
        }
    }

    /// Creates a non-uniform scale matrix.
    #[inline]
    #[must_use]
    pub fn from_scale(s: Vec3f) -> Self {
        Self {
            cols: [
                [f64::from(s.x), 0.0, 0.0, 0.0],
                [0.0, f64::from(s.y), 0.0, 0.0],
                [0.0, 0.0, f64::from(s.z), 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Builds `T · R · S` directly, column by column.
    ///
    /// Column `i` is the rotated basis axis `i` scaled by `scale[i]`;
    /// column 3 is `[translation, 1]`. Equivalent to multiplying the three
    /// factor matrices, without the two full 4×4 products.
    #[must_use]
    pub fn compose_trs(translation: Vec3d, rotation: Quat, scale: Vec3f) -> Self {
        let Quat { x, y, z, w } = rotation;
        let (x2, y2, z2) = (x + x, y + y, z + z);
        let (xx, yy, zz) = (x * x2, y * y2, z * z2);
        let (xy, yz, xz) = (x * y2, y * z2, x * z2);
        let (wx, wy, wz) = (w * x2, w * y2, w * z2);
        let (sx, sy, sz) = (f64::from(scale.x), f64::from(scale.y), f64::from(scale.z));

        Self {
            cols: [
                [(1.0 - (yy + zz)) * sx, (xy + wz) * sx, (xz - wy) * sx, 0.0],
                [(xy - wz) * sy, (1.0 - (xx + zz)) * sy, (yz + wx) * sy, 0.0],
                [(xz + wy) * sz, (yz - wx) * sz, (1.0 - (xx + yy)) * sz, 0.0],
                [translation.x, translation.y, translation.z, 1.0],
            ],
        }
    }

    /// General 4×4 inverse by cofactor expansion.
    ///
    /// Works for any invertible matrix, including projective ones; this is
    /// deliberately not a rigid-transform shortcut. A singular input yields
    /// non-finite entries rather than an error — callers invert only
    /// matrices known to be invertible (TRS with non-zero scale always is).
    #[must_use]
    pub fn inverse(self) -> Self {
        let c = &self.cols;
        let (a00, a10, a20, a30) = (c[0][0], c[0][1], c[0][2], c[0][3]);
        let (a01, a11, a21, a31) = (c[1][0], c[1][1], c[1][2], c[1][3]);
        let (a02, a12, a22, a32) = (c[2][0], c[2][1], c[2][2], c[2][3]);
        let (a03, a13, a23, a33) = (c[3][0], c[3][1], c[3][2], c[3][3]);

        // 2×2 minors of the bottom and top row pairs.
        let b00 = a20 * a31 - a21 * a30;
        let b01 = a20 * a32 - a22 * a30;
        let b02 = a20 * a33 - a23 * a30;
        let b03 = a21 * a32 - a22 * a31;
        let b04 = a21 * a33 - a23 * a31;
        let b05 = a22 * a33 - a23 * a32;
        let t00 = a00 * a11 - a01 * a10;
        let t01 = a00 * a12 - a02 * a10;
        let t02 = a00 * a13 - a03 * a10;
        let t03 = a01 * a12 - a02 * a11;
        let t04 = a01 * a13 - a03 * a11;
        let t05 = a02 * a13 - a03 * a12;

        // Adjugate, row i / column j.
        let i00 = a11 * b05 - a12 * b04 + a13 * b03;
        let i01 = -(a01 * b05 - a02 * b04 + a03 * b03);
        let i02 = a31 * t05 - a32 * t04 + a33 * t03;
        let i03 = -(a21 * t05 - a22 * t04 + a23 * t03);
        let i10 = -(a10 * b05 - a12 * b02 + a13 * b01);
        let i11 = a00 * b05 - a02 * b02 + a03 * b01;
        let i12 = -(a30 * t05 - a32 * t02 + a33 * t01);
        let i13 = a20 * t05 - a22 * t02 + a23 * t01;
        let i20 = a10 * b04 - a11 * b02 + a13 * b00;
        let i21 = -(a00 * b04 - a01 * b02 + a03 * b00);
        let i22 = a30 * t04 - a31 * t02 + a33 * t00;
        let i23 = -(a20 * t04 - a21 * t02 + a23 * t00);
        let i30 = -(a10 * b03 - a11 * b01 + a12 * b00);
        let i31 = a00 * b03 - a01 * b01 + a02 * b00;
        let i32 = -(a30 * t03 - a31 * t01 + a32 * t00);
        let i33 = a20 * t03 - a21 * t01 + a22 * t00;

        // Expansion along column 0; 1/0 propagates as non-finite output.
        let det = a00 * i00 + a10 * i01 + a20 * i02 + a30 * i03;
        let inv = 1.0 / det;

        Self {
            cols: [
                [i00 * inv, i10 * inv, i20 * inv, i30 * inv],
                [i01 * inv, i11 * inv, i21 * inv, i31 * inv],
                [i02 * inv, i12 * inv, i22 * inv, i32 * inv],
                [i03 * inv, i13 * inv, i23 * inv, i33 * inv],
            ],
        }
    }

    /// Transforms a point, including the projective `w`-divide.
    ///
    /// Use this when the matrix may be non-affine; translation applies.
    #[must_use]
    pub fn transform_point(self, p: Vec3d) -> Vec3d {
        let c = &self.cols;
        let x = c[0][0] * p.x + c[1][0] * p.y + c[2][0] * p.z + c[3][0];
        let y = c[0][1] * p.x + c[1][1] * p.y + c[2][1] * p.z + c[3][1];
        let z = c[0][2] * p.x + c[1][2] * p.y + c[2][2] * p.z + c[3][2];
        let w = c[0][3] * p.x + c[1][3] * p.y + c[2][3] * p.z + c[3][3];
        Vec3d::new(x, y, z) * (1.0 / w)
    }

    /// Transforms a direction: linear part only, translation ignored, no
    /// `w`-divide.
    #[must_use]
    pub fn transform_vector(self, v: Vec3d) -> Vec3d {
        let c = &self.cols;
        Vec3d::new(
            c[0][0] * v.x + c[1][0] * v.y + c[2][0] * v.z,
            c[0][1] * v.x + c[1][1] * v.y + c[2][1] * v.z,
            c[0][2] * v.x + c[1][2] * v.y + c[2][2] * v.z,
        )
    }

    /// Extracts translation, rotation, and scale magnitudes from a TRS
    /// matrix.
    ///
    /// Translation is read off column 3. Rotation is rebuilt from the
    /// normalized second and third basis columns via
    /// [`Quat::look_rotation`], which degrades to identity instead of
    /// failing on unusable bases. Each scale component is the projection of
    /// the original basis column onto the derived rotation axis; deriving
    /// the rotation first costs a little precision but keeps the extraction
    /// stable under shear-like error, and that order is intentional.
    ///
    /// Scale *sign* is not recovered here. Callers that track signed scale
    /// restore it from a previously known value with
    /// [`Vec3f::copy_sign`].
    #[must_use]
    #[expect(clippy::cast_possible_truncation, reason = "scale is single-precision by contract")]
    pub fn decompose_trs(self) -> (Vec3d, Quat, Vec3f) {
        let c = &self.cols;
        let translation = Vec3d::new(c[3][0], c[3][1], c[3][2]);
        let basis_x = Vec3d::new(c[0][0], c[0][1], c[0][2]);
        let basis_y = Vec3d::new(c[1][0], c[1][1], c[1][2]);
        let basis_z = Vec3d::new(c[2][0], c[2][1], c[2][2]);

        let rotation = Quat::look_rotation(basis_z, basis_y);
        let scale = Vec3f::new(
            basis_x.dot(rotation.rotate(Vec3d::X)) as f32,
            basis_y.dot(rotation.rotate(Vec3d::Y)) as f32,
            basis_z.dot(rotation.rotate(Vec3d::Z)) as f32,
        );
        (translation, rotation, scale)
    }

    /// Is this matrix [finite](f64::is_finite)?
    #[inline]
    #[must_use]
    pub const fn is_finite(&self) -> bool {
        let c = &self.cols;
        c[0][0].is_finite()
            && c[0][1].is_finite()
            && c[0][2].is_finite()
            && c[0][3].is_finite()
            && c[1][0].is_finite()
            && c[1][1].is_finite()
            && c[1][2].is_finite()
            && c[1][3].is_finite()
            && c[2][0].is_finite()
            && c[2][1].is_finite()
            && c[2][2].is_finite()
            && c[2][3].is_finite()
            && c[3][0].is_finite()
            && c[3][1].is_finite()
            && c[3][2].is_finite()
            && c[3][3].is_finite()
    }

    /// Is any entry [NaN](f64::is_nan)?
    #[inline]
    #[must_use]
    pub const fn is_nan(&self) -> bool {
        let c = &self.cols;
        c[0][0].is_nan()
            || c[0][1].is_nan()
            || c[0][2].is_nan()
            || c[0][3].is_nan()
            || c[1][0].is_nan()
            || c[1][1].is_nan()
            || c[1][2].is_nan()
            || c[1][3].is_nan()
            || c[2][0].is_nan()
            || c[2][1].is_nan()
            || c[2][2].is_nan()
            || c[2][3].is_nan()
            || c[3][0].is_nan()
            || c[3][1].is_nan()
            || c[3][2].is_nan()
            || c[3][3].is_nan()
    }
}

impl Default for Matrix4d {
    #[inline]
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul for Matrix4d {
    type Output = Self;

    /// Standard 4×4 product; column `i` of the result is `self` applied to
    /// column `i` of `rhs`.
    fn mul(self, rhs: Self) -> Self {
        let a = &self.cols;
        let b = &rhs.cols;
        let mut out = [[0.0_f64; 4]; 4];
        let mut j = 0;
        while j < 4 {
            let mut i = 0;
            while i < 4 {
                out[j][i] =
                    a[0][i] * b[j][0] + a[1][i] * b[j][1] + a[2][i] * b[j][2] + a[3][i] * b[j][3];
                i += 1;
            }
            j += 1;
        }
        Self { cols: out }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-6;

    fn approx(a: Matrix4d, b: Matrix4d, eps: f64) -> bool {
        let mut j = 0;
        while j < 4 {
            let mut i = 0;
            while i < 4 {
                if (a.cols[j][i] - b.cols[j][i]).abs() > eps {
                    return false;
                }
                i += 1;
            }
            j += 1;
        }
        true
    }

    fn sample_trs() -> Matrix4d {
        Matrix4d::compose_trs(
            Vec3d::new(10.0, -4.0, 2.5),
            Quat::from_axis_angle(Vec3d::new(0.0, 0.6, 0.8), 0.9),
            Vec3f::new(2.0, 3.0, 0.5),
        )
    }

    #[test]
    fn default_is_identity() {
        assert_eq!(Matrix4d::default(), Matrix4d::IDENTITY);
    }

    #[test]
    fn identity_multiply() {
        let t = Matrix4d::from_translation(Vec3d::new(1.0, 2.0, 3.0));
        assert_eq!(Matrix4d::IDENTITY * t, t);
        assert_eq!(t * Matrix4d::IDENTITY, t);
    }

    #[test]
    fn translation_composition() {
        let a = Matrix4d::from_translation(Vec3d::new(1.0, 0.0, 0.0));
        let b = Matrix4d::from_translation(Vec3d::new(0.0, 2.0, 0.0));
        // Combined translation should be (1, 2, 0).
        assert_eq!((a * b).col(3), [1.0, 2.0, 0.0, 1.0]);
    }

    #[test]
    fn multiply_is_associative() {
        let a = sample_trs();
        let b = Matrix4d::compose_trs(
            Vec3d::new(-3.0, 0.5, 8.0),
            Quat::from_axis_angle(Vec3d::X, -1.2),
            Vec3f::ONE,
        );
        let c = Matrix4d::from_scale(Vec3f::new(0.25, 4.0, 1.0));
        assert!(approx((a * b) * c, a * (b * c), 1e-9));
    }

    #[test]
    fn compose_matches_factor_product() {
        let t = Vec3d::new(5.0, -1.0, 7.0);
        let r = Quat::from_axis_angle(Vec3d::Z, 0.4);
        let s = Vec3f::new(2.0, 0.5, 3.0);
        let product = Matrix4d::from_translation(t)
            * Matrix4d::compose_trs(Vec3d::ZERO, r, Vec3f::ONE)
            * Matrix4d::from_scale(s);
        assert!(approx(Matrix4d::compose_trs(t, r, s), product, 1e-12));
    }

    #[test]
    fn compose_bottom_row_is_affine() {
        let m = sample_trs();
        for j in 0..3 {
            assert_eq!(m.cols[j][3], 0.0);
        }
        assert_eq!(m.cols[3][3], 1.0);
    }

    #[test]
    fn inverse_law() {
        let m = sample_trs();
        assert!(approx(m * m.inverse(), Matrix4d::IDENTITY, EPS));
        assert!(approx(m.inverse() * m, Matrix4d::IDENTITY, EPS));
    }

    #[test]
    fn inverse_of_projective_matrix() {
        // A perspective-style matrix exercises the full 4×4 path.
        let mut m = Matrix4d::IDENTITY;
        m.cols[2][3] = -1.0;
        m.cols[3][2] = -0.2;
        m.cols[3][3] = 0.0;
        assert!(approx(m * m.inverse(), Matrix4d::IDENTITY, EPS));
    }

    #[test]
    fn inverse_of_singular_is_non_finite() {
        let singular = Matrix4d::from_scale(Vec3f::new(1.0, 0.0, 1.0));
        assert!(!singular.inverse().is_finite());
    }

    #[test]
    fn transform_point_applies_translation() {
        let m = Matrix4d::from_translation(Vec3d::new(100.0, 0.0, -3.0));
        let p = m.transform_point(Vec3d::new(1.0, 2.0, 3.0));
        assert_eq!(p, Vec3d::new(101.0, 2.0, 0.0));
    }

    #[test]
    fn transform_point_divides_by_w() {
        let mut m = Matrix4d::IDENTITY;
        m.cols[3][3] = 2.0;
        let p = m.transform_point(Vec3d::new(4.0, 6.0, 8.0));
        assert_eq!(p, Vec3d::new(2.0, 3.0, 4.0));
    }

    #[test]
    fn transform_vector_ignores_translation() {
        let m = Matrix4d::from_translation(Vec3d::new(100.0, 100.0, 100.0));
        let v = m.transform_vector(Vec3d::new(1.0, 2.0, 3.0));
        assert_eq!(v, Vec3d::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn decompose_recovers_trs() {
        let t = Vec3d::new(1e7, -2e7, 3.5);
        let r = Quat::from_axis_angle(Vec3d::new(0.48, 0.6, 0.64), 2.1);
        let s = Vec3f::new(2.0, 3.0, 4.0);
        let (dt, dr, ds) = Matrix4d::compose_trs(t, r, s).decompose_trs();

        // Translation is read off the matrix, so it survives exactly.
        assert_eq!(dt, t);
        assert!((dr.dot(r).abs() - 1.0).abs() < 1e-9, "got {dr:?}");
        assert!((f64::from(ds.x) - 2.0).abs() < 1e-6);
        assert!((f64::from(ds.y) - 3.0).abs() < 1e-6);
        assert!((f64::from(ds.z) - 4.0).abs() < 1e-6);
    }

    #[test]
    fn decompose_loses_scale_sign() {
        let s = Vec3f::new(-2.0, 3.0, -4.0);
        let m = Matrix4d::compose_trs(Vec3d::ZERO, Quat::IDENTITY, s);
        let (_, _, ds) = m.decompose_trs();
        // Magnitudes only; the caller restores sign.
        let restored = ds.copy_sign(s);
        assert!((restored.x - s.x).abs() < 1e-6);
        assert!((restored.y - s.y).abs() < 1e-6);
        assert!((restored.z - s.z).abs() < 1e-6);
    }

    #[test]
    fn decompose_of_non_finite_propagates() {
        let singular = Matrix4d::from_scale(Vec3f::new(0.0, 0.0, 0.0));
        let inv = singular.inverse();
        let (t, _, _) = inv.decompose_trs();
        assert!(!t.is_finite());
    }

    #[test]
    fn identity_is_finite() {
        assert!(Matrix4d::IDENTITY.is_finite());
        assert!(!Matrix4d::IDENTITY.is_nan());
    }

    #[test]
    fn nan_detected() {
        let mut t = Matrix4d::IDENTITY;
        t.cols[2][1] = f64::NAN;
        assert!(!t.is_finite());
        assert!(t.is_nan());
    }

    #[test]
    fn infinity_detected() {
        let mut t = Matrix4d::IDENTITY;
        t.cols[0][3] = f64::INFINITY;
        assert!(!t.is_finite());
        assert!(!t.is_nan());
    }
}
