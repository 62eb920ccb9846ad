// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The error taxonomy for the carver.

use crate::carver::CarveState;

/// Everything that can go wrong between ingesting a buffer and handing
/// back the carved result.
#[derive(thiserror::Error, Debug)]
pub enum CarveError {
    /// The request was rejected before any carving started.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Two grids that must agree in size do not.  Inside the carver this
    /// is always recovered from by recomputing.
    #[error("dimension mismatch: expected {expected:?}, found {found:?}")]
    DimensionMismatch {
        /// (width, height) that was required.
        expected: (u32, u32),
        /// (width, height) that was supplied.
        found: (u32, u32),
    },

    /// The pixel data is not packed 4-byte RGBA, or its layout is
    /// inconsistent with the declared dimensions.
    #[error("unsupported buffer format: {0}")]
    BufferFormat(String),

    /// A buffer or grid could not be allocated.
    #[error("unable to allocate {bytes} bytes")]
    ResourceExhaustion {
        /// The size of the failed allocation.
        bytes: usize,
    },

    /// Every path to the bottom row crosses the border or a protected
    /// pixel.
    #[error("no removable seam in a {width}x{height} grid")]
    NoFeasibleSeam {
        /// Width of the cost map.
        width: u32,
        /// Height of the cost map.
        height: u32,
    },

    /// A seam does not fit the buffer it is being removed from.
    #[error("invalid seam: {0}")]
    InvalidSeam(String),

    /// The carve state machine was driven out of order.
    #[error("illegal carve transition from {from:?} to {to:?}")]
    InvalidTransition {
        /// The state the session was in.
        from: CarveState,
        /// The state that was requested.
        to: CarveState,
    },
}
