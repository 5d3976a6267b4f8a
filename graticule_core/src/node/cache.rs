// Copyright 2026 the Graticule Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-cache validity state.

/// Validity of one cached derived value.
///
/// Each node carries one flag per cache (local matrix, universe rotation,
/// universe matrix, world matrix). An explicit enum rather than a bare bool
/// keeps staleness reasoning readable at the call sites that combine
/// several flags.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CacheState {
    /// The cached value must be recomputed before use.
    #[default]
    Stale,
    /// The cached value reflects current inputs.
    Fresh,
}

impl CacheState {
    /// Does the cache need recomputation?
    #[inline]
    #[must_use]
    pub const fn is_stale(self) -> bool {
        matches!(self, Self::Stale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_stale() {
        assert!(CacheState::default().is_stale());
        assert!(!CacheState::Fresh.is_stale());
    }
}
