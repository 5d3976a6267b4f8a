// Copyright 2026 the Graticule Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Double- and single-precision 3-component vectors.
//!
//! [`Vec3d`] carries universe-scale positions, where 32-bit floats run out of
//! mantissa long before planetary distances. [`Vec3f`] carries quantities that
//! never need more than single precision (local scale, host-facing output).

use core::ops::{Add, Mul, Neg, Sub};

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;

/// A 3-component `f64` vector.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vec3d {
    /// X component.
    pub x: f64,
    /// Y component.
    pub y: f64,
    /// Z component.
    pub z: f64,
}

impl Vec3d {
    /// The zero vector.
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    /// The unit X axis.
    pub const X: Self = Self::new(1.0, 0.0, 0.0);

    /// The unit Y axis.
    pub const Y: Self = Self::new(0.0, 1.0, 0.0);

    /// The unit Z axis.
    pub const Z: Self = Self::new(0.0, 0.0, 1.0);

    /// Creates a vector from components.
    #[inline]
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Creates a vector with all components set to `v`.
    #[inline]
    #[must_use]
    pub const fn splat(v: f64) -> Self {
        Self::new(v, v, v)
    }

    /// Dot product.
    #[inline]
    #[must_use]
    pub fn dot(self, rhs: Self) -> f64 {
        self.x * rhs.x + self.y * rhs.y + self.z * rhs.z
    }

    /// Cross product (right-handed).
    #[inline]
    #[must_use]
    pub fn cross(self, rhs: Self) -> Self {
        Self::new(
            self.y * rhs.z - self.z * rhs.y,
            self.z * rhs.x - self.x * rhs.z,
            self.x * rhs.y - self.y * rhs.x,
        )
    }

    /// Squared Euclidean length.
    #[inline]
    #[must_use]
    pub fn length_squared(self) -> f64 {
        self.dot(self)
    }

    /// Euclidean length.
    #[inline]
    #[must_use]
    pub fn length(self) -> f64 {
        self.length_squared().sqrt()
    }

    /// Returns the unit vector in the same direction.
    ///
    /// A zero-length input produces non-finite components rather than an
    /// error; validation is the caller's responsibility.
    #[inline]
    #[must_use]
    pub fn normalize(self) -> Self {
        self * (1.0 / self.length())
    }

    /// Is every component [finite](f64::is_finite)?
    #[inline]
    #[must_use]
    pub const fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Narrows to single precision, losing mantissa bits.
    #[inline]
    #[must_use]
    #[expect(clippy::cast_possible_truncation, reason = "lossy by contract")]
    pub fn to_f32(self) -> Vec3f {
        Vec3f::new(self.x as f32, self.y as f32, self.z as f32)
    }
}

impl Add for Vec3d {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3d {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Neg for Vec3d {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

impl Mul<f64> for Vec3d {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: f64) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

/// A 3-component `f32` vector.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vec3f {
    /// X component.
    pub x: f32,
    /// Y component.
    pub y: f32,
    /// Z component.
    pub z: f32,
}

impl Vec3f {
    /// The zero vector.
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    /// The all-ones vector (identity scale).
    pub const ONE: Self = Self::new(1.0, 1.0, 1.0);

    /// Creates a vector from components.
    #[inline]
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Creates a vector with all components set to `v`.
    #[inline]
    #[must_use]
    pub const fn splat(v: f32) -> Self {
        Self::new(v, v, v)
    }

    /// Returns `self`'s magnitudes with the per-axis sign of `reference`.
    ///
    /// [`Matrix4d::decompose_trs`](crate::Matrix4d::decompose_trs) recovers
    /// scale magnitudes only; callers that track a signed scale restore it
    /// through this.
    #[inline]
    #[must_use]
    pub fn copy_sign(self, reference: Self) -> Self {
        Self::new(
            self.x.copysign(reference.x),
            self.y.copysign(reference.y),
            self.z.copysign(reference.z),
        )
    }

    /// Is every component [finite](f32::is_finite)?
    #[inline]
    #[must_use]
    pub const fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Widens to double precision (exact).
    #[inline]
    #[must_use]
    pub fn to_f64(self) -> Vec3d {
        Vec3d::new(f64::from(self.x), f64::from(self.y), f64::from(self.z))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cross_follows_right_hand_rule() {
        assert_eq!(Vec3d::X.cross(Vec3d::Y), Vec3d::Z);
        assert_eq!(Vec3d::Y.cross(Vec3d::Z), Vec3d::X);
        assert_eq!(Vec3d::Z.cross(Vec3d::X), Vec3d::Y);
    }

    #[test]
    fn normalize_preserves_direction() {
        let v = Vec3d::new(3.0, 0.0, 4.0).normalize();
        assert!((v.length() - 1.0).abs() < 1e-15);
        assert!((v.x - 0.6).abs() < 1e-15);
        assert!((v.z - 0.8).abs() < 1e-15);
    }

    #[test]
    fn normalize_zero_is_non_finite() {
        assert!(!Vec3d::ZERO.normalize().is_finite());
    }

    #[test]
    fn copy_sign_restores_per_axis_sign() {
        let magnitude = Vec3f::new(2.0, 3.0, 4.0);
        let reference = Vec3f::new(-1.0, 5.0, -0.5);
        assert_eq!(
            magnitude.copy_sign(reference),
            Vec3f::new(-2.0, 3.0, -4.0)
        );
    }

    #[test]
    fn copy_sign_on_negative_magnitudes() {
        let magnitude = Vec3f::new(-2.0, -3.0, 4.0);
        let reference = Vec3f::new(1.0, -1.0, 1.0);
        assert_eq!(magnitude.copy_sign(reference), Vec3f::new(2.0, -3.0, 4.0));
    }

    #[test]
    fn f32_round_trip_is_exact_for_small_values() {
        let v = Vec3f::new(1.5, -2.25, 0.125);
        assert_eq!(v.to_f64().to_f32(), v);
    }

    #[test]
    fn widening_keeps_double_precision_offsets() {
        // A planetary-scale coordinate plus a small offset survives in f64
        // but collapses in f32.
        let planetary = Vec3d::new(6_378_137.0 + 0.001, 0.0, 0.0);
        assert!(planetary.x - 6_378_137.0 > 0.0009);
        let narrowed = planetary.to_f32();
        assert_eq!(narrowed.x, 6_378_137.0);
    }
}
