// Copyright 2026 the Graticule Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Double-precision transform math for planetary-scale scenes.
//!
//! `graticule_math` is the pure kernel under the `graticule_core` node
//! hierarchy: 4×4 double matrices, double 3-vectors, and unit quaternions,
//! with exactly the operations hierarchical TRS bookkeeping needs —
//! composition, multiplication, general inverse, decomposition, homogeneous
//! point/vector transform, and ZXY Euler extraction.
//!
//! Everything here is a plain value type with no interior state, so the
//! kernel is freely callable from any number of threads.
//!
//! # Failure semantics
//!
//! The kernel never returns errors and never panics. Singular matrices,
//! zero-length bases, and other degenerate inputs produce non-finite (or
//! documented fallback) output that propagates through dependent
//! computations; validating inputs is the caller's concern.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//!   Without it, float intrinsics come from `libm` via kurbo's
//!   `FloatFuncs`.

#![cfg_attr(not(feature = "std"), no_std)]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod matrix;
pub mod quat;
pub mod vec;

pub use matrix::Matrix4d;
pub use quat::Quat;
pub use vec::{Vec3d, Vec3f};
