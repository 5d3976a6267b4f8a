// Copyright 2026 the Graticule Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Double-precision unit quaternion.
//!
//! Composition and inversion assume normalized input; the norm is not
//! enforced. As everywhere in this crate, degenerate input produces
//! non-finite or fallback output instead of an error.

use core::ops::Mul;

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;

use crate::vec::Vec3d;

/// Degenerate-basis rejection bounds for [`Quat::look_rotation`].
const LOOK_MIN_LENGTH_SQ: f64 = 1e-35;
const LOOK_MAX_LENGTH_SQ: f64 = 1e35;

/// A unit quaternion (`x`, `y`, `z` imaginary, `w` real).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quat {
    /// Imaginary X component.
    pub x: f64,
    /// Imaginary Y component.
    pub y: f64,
    /// Imaginary Z component.
    pub z: f64,
    /// Real component.
    pub w: f64,
}

impl Quat {
    /// The identity rotation.
    pub const IDENTITY: Self = Self::new(0.0, 0.0, 0.0, 1.0);

    /// Creates a quaternion from components.
    #[inline]
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Self { x, y, z, w }
    }

    /// Creates a rotation of `radians` around a **unit** `axis`.
    #[must_use]
    pub fn from_axis_angle(axis: Vec3d, radians: f64) -> Self {
        let half = radians * 0.5;
        let s = half.sin();
        Self::new(axis.x * s, axis.y * s, axis.z * s, half.cos())
    }

    /// Dot product.
    #[inline]
    #[must_use]
    pub fn dot(self, rhs: Self) -> f64 {
        self.x * rhs.x + self.y * rhs.y + self.z * rhs.z + self.w * rhs.w
    }

    /// Quaternion norm.
    #[inline]
    #[must_use]
    pub fn length(self) -> f64 {
        self.dot(self).sqrt()
    }

    /// Returns the normalized quaternion.
    #[inline]
    #[must_use]
    pub fn normalize(self) -> Self {
        let inv = 1.0 / self.length();
        Self::new(self.x * inv, self.y * inv, self.z * inv, self.w * inv)
    }

    /// Inverse of a unit quaternion (the conjugate).
    #[inline]
    #[must_use]
    pub const fn inverse(self) -> Self {
        Self::new(-self.x, -self.y, -self.z, self.w)
    }

    /// Rotates a vector by this quaternion.
    #[must_use]
    pub fn rotate(self, v: Vec3d) -> Vec3d {
        // v + 2 q_v × (q_v × v + w v)
        let qv = Vec3d::new(self.x, self.y, self.z);
        let t = qv.cross(v) * 2.0;
        v + t * self.w + qv.cross(t)
    }

    /// Builds the rotation whose Z axis points along `forward` and whose Y
    /// axis stays as close to `up` as orthonormality allows.
    ///
    /// Inputs need not be normalized. A basis that cannot be orthonormalized
    /// (zero-length or near-parallel columns, non-finite input) yields
    /// [`Quat::IDENTITY`] rather than failing.
    #[must_use]
    pub fn look_rotation(forward: Vec3d, up: Vec3d) -> Self {
        let forward_sq = forward.length_squared();
        let up_sq = up.length_squared();
        let forward = forward * (1.0 / forward_sq.sqrt());
        let up = up * (1.0 / up_sq.sqrt());
        let right = up.cross(forward);
        let right_sq = right.length_squared();
        let right = right * (1.0 / right_sq.sqrt());

        let min = forward_sq.min(up_sq).min(right_sq);
        let max = forward_sq.max(up_sq).max(right_sq);
        if min > LOOK_MIN_LENGTH_SQ && max < LOOK_MAX_LENGTH_SQ && right.is_finite() {
            Self::from_basis(right, forward.cross(right), forward)
        } else {
            Self::IDENTITY
        }
    }

    /// Converts an orthonormal right-handed basis (columns) to a quaternion.
    fn from_basis(right: Vec3d, up: Vec3d, forward: Vec3d) -> Self {
        let (m00, m10, m20) = (right.x, right.y, right.z);
        let (m01, m11, m21) = (up.x, up.y, up.z);
        let (m02, m12, m22) = (forward.x, forward.y, forward.z);

        let trace = m00 + m11 + m22;
        if trace > 0.0 {
            let s = (trace + 1.0).sqrt() * 2.0;
            Self::new((m21 - m12) / s, (m02 - m20) / s, (m10 - m01) / s, s * 0.25)
        } else if m00 > m11 && m00 > m22 {
            let s = (1.0 + m00 - m11 - m22).sqrt() * 2.0;
            Self::new(s * 0.25, (m01 + m10) / s, (m02 + m20) / s, (m21 - m12) / s)
        } else if m11 > m22 {
            let s = (1.0 + m11 - m00 - m22).sqrt() * 2.0;
            Self::new((m01 + m10) / s, s * 0.25, (m12 + m21) / s, (m02 - m20) / s)
        } else {
            let s = (1.0 + m22 - m00 - m11).sqrt() * 2.0;
            Self::new((m02 + m20) / s, (m12 + m21) / s, s * 0.25, (m10 - m01) / s)
        }
    }

    /// Extracts Euler angles for the Z-then-X-then-Y application order.
    ///
    /// Returns `(x, y, z)` angles in radians such that
    /// `Qy(y) · Qx(x) · Qz(z)` reproduces `self`. Near the degenerate
    /// configuration (X rotation at ±90°, where Y and Z rotate around the
    /// same axis) the Z angle is forced to 0 and the Y angle absorbs the
    /// remaining rotation; the branch cutoff matches the reference
    /// implementation and must not be altered.
    #[must_use]
    pub fn euler_zxy(self) -> Vec3d {
        const EPSILON: f64 = 1e-6;
        const CUTOFF: f64 = (1.0 - 2.0 * EPSILON) * (1.0 - 2.0 * EPSILON);

        let Self { x, y, z, w } = self;
        let sin_x = 2.0 * (w * x - y * z);
        if sin_x * sin_x < CUTOFF {
            Vec3d::new(
                asin_clamped(sin_x),
                (2.0 * (x * z + w * y)).atan2(w * w + z * z - x * x - y * y),
                (2.0 * (x * y + w * z)).atan2(w * w + y * y - x * x - z * z),
            )
        } else {
            Vec3d::new(
                asin_clamped(sin_x.clamp(-1.0, 1.0)),
                (2.0 * (w * y - x * z)).atan2(w * w + x * x - y * y - z * z),
                0.0,
            )
        }
    }

    /// Widens a single-precision `[x, y, z, w]` quaternion from the host
    /// boundary.
    #[inline]
    #[must_use]
    pub fn from_xyzw_f32(q: [f32; 4]) -> Self {
        Self::new(
            f64::from(q[0]),
            f64::from(q[1]),
            f64::from(q[2]),
            f64::from(q[3]),
        )
    }

    /// Narrows to a single-precision `[x, y, z, w]` quaternion for the host
    /// boundary.
    #[inline]
    #[must_use]
    #[expect(clippy::cast_possible_truncation, reason = "lossy by contract")]
    pub fn to_xyzw_f32(self) -> [f32; 4] {
        [self.x as f32, self.y as f32, self.z as f32, self.w as f32]
    }

    /// Is every component [finite](f64::is_finite)?
    #[inline]
    #[must_use]
    pub const fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite() && self.w.is_finite()
    }
}

impl Default for Quat {
    #[inline]
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul for Quat {
    type Output = Self;

    /// Hamilton product; `(a * b).rotate(v) == a.rotate(b.rotate(v))`.
    fn mul(self, rhs: Self) -> Self {
        Self::new(
            self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            self.w * rhs.y - self.x * rhs.z + self.y * rhs.w + self.z * rhs.x,
            self.w * rhs.z + self.x * rhs.y - self.y * rhs.x + self.z * rhs.w,
            self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
        )
    }
}

/// `asin` in terms of `atan2`, exact on the clamped domain.
#[inline]
fn asin_clamped(s: f64) -> f64 {
    s.atan2((1.0 - s * s).max(0.0).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    fn approx(a: Vec3d, b: Vec3d, eps: f64) -> bool {
        (a.x - b.x).abs() < eps && (a.y - b.y).abs() < eps && (a.z - b.z).abs() < eps
    }

    #[test]
    fn identity_rotates_nothing() {
        let v = Vec3d::new(1.0, 2.0, 3.0);
        assert_eq!(Quat::IDENTITY.rotate(v), v);
    }

    #[test]
    fn quarter_turn_around_z() {
        let q = Quat::from_axis_angle(Vec3d::Z, core::f64::consts::FRAC_PI_2);
        let v = q.rotate(Vec3d::X);
        assert!(approx(v, Vec3d::Y, EPS), "got {v:?}");
    }

    #[test]
    fn product_composes_rotations() {
        let a = Quat::from_axis_angle(Vec3d::Z, 0.7);
        let b = Quat::from_axis_angle(Vec3d::X, -0.3);
        let v = Vec3d::new(0.5, -1.5, 2.0);
        let composed = (a * b).rotate(v);
        let sequential = a.rotate(b.rotate(v));
        assert!(approx(composed, sequential, EPS), "got {composed:?}");
    }

    #[test]
    fn inverse_undoes_rotation() {
        let q = Quat::from_axis_angle(Vec3d::new(0.0, 0.6, 0.8), 1.1);
        let v = Vec3d::new(4.0, 5.0, 6.0);
        assert!(approx(q.inverse().rotate(q.rotate(v)), v, 1e-10));
    }

    #[test]
    fn look_rotation_of_canonical_basis_is_identity() {
        let q = Quat::look_rotation(Vec3d::Z, Vec3d::Y);
        assert!((q.dot(Quat::IDENTITY).abs() - 1.0).abs() < EPS);
    }

    #[test]
    fn look_rotation_points_z_along_forward() {
        let forward = Vec3d::new(1.0, 2.0, -0.5);
        let q = Quat::look_rotation(forward, Vec3d::Y);
        let mapped = q.rotate(Vec3d::Z);
        assert!(approx(mapped, forward.normalize(), 1e-10), "got {mapped:?}");
    }

    #[test]
    fn look_rotation_ignores_input_lengths() {
        let a = Quat::look_rotation(Vec3d::new(0.0, 0.0, 3.0), Vec3d::new(0.0, 7.0, 0.0));
        assert!((a.dot(Quat::IDENTITY).abs() - 1.0).abs() < EPS);
    }

    #[test]
    fn look_rotation_degenerate_basis_falls_back_to_identity() {
        // Up exactly along the look direction: the cross product vanishes.
        assert_eq!(Quat::look_rotation(Vec3d::Z, Vec3d::Z), Quat::IDENTITY);
        assert_eq!(Quat::look_rotation(Vec3d::ZERO, Vec3d::Y), Quat::IDENTITY);
    }

    #[test]
    fn euler_round_trip_zxy() {
        let (rx, ry, rz) = (0.4, -1.1, 2.3);
        let q = Quat::from_axis_angle(Vec3d::Y, ry)
            * Quat::from_axis_angle(Vec3d::X, rx)
            * Quat::from_axis_angle(Vec3d::Z, rz);
        let e = q.euler_zxy();
        assert!(approx(e, Vec3d::new(rx, ry, rz), 1e-10), "got {e:?}");
    }

    #[test]
    fn euler_gimbal_lock_zeroes_third_angle() {
        // X pitch at exactly +90°: Y and Z rotate around the same axis.
        let q = Quat::from_axis_angle(Vec3d::Y, 0.8)
            * Quat::from_axis_angle(Vec3d::X, core::f64::consts::FRAC_PI_2)
            * Quat::from_axis_angle(Vec3d::Z, 0.3);
        let e = q.euler_zxy();
        assert!(e.is_finite(), "got {e:?}");
        assert_eq!(e.z, 0.0);
        assert!((e.x - core::f64::consts::FRAC_PI_2).abs() < 1e-6, "got {e:?}");
        // The Y angle absorbs the zeroed Z rotation.
        assert!((e.y - (0.8 - 0.3)).abs() < 1e-6, "got {e:?}");
    }

    #[test]
    fn euler_reconstructs_gimbal_locked_rotation() {
        let q = Quat::from_axis_angle(Vec3d::Y, -0.25)
            * Quat::from_axis_angle(Vec3d::X, -core::f64::consts::FRAC_PI_2);
        let e = q.euler_zxy();
        let back = Quat::from_axis_angle(Vec3d::Y, e.y)
            * Quat::from_axis_angle(Vec3d::X, e.x)
            * Quat::from_axis_angle(Vec3d::Z, e.z);
        assert!((q.dot(back).abs() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn f32_boundary_round_trip() {
        let q = Quat::from_axis_angle(Vec3d::X, 0.5);
        let narrowed = q.to_xyzw_f32();
        let widened = Quat::from_xyzw_f32(narrowed);
        assert!((q.dot(widened).abs() - 1.0).abs() < 1e-7);
    }
}
