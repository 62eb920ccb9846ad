// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Content-aware resizing of packed RGBA buffers by seam carving.
//!
//! A [`SeamCarver`] repeatedly finds the connected top-to-bottom path of
//! least energy through an image and cuts it out, one column at a time,
//! then does the same for rows on the transposed image.  Pixels marked
//! in a [`ConstraintMask`] are never cut.

pub mod buffer;
pub mod cache;
pub mod carver;
pub mod costmap;
pub mod dump;
pub mod energy;
pub mod error;
pub mod mask;
mod parallel;
pub mod remover;
pub mod seam;
pub mod twodmap;

pub use buffer::PixelBuffer;
pub use cache::{CacheKey, MemorySeamCache, SeamCache};
pub use carver::{
    seamcarve, Axis, CarveOptions, CarveOutcome, CarveRequest, CarveState, PhaseTimings,
    ProgressSink, Rebuild, SeamCarver,
};
pub use costmap::SeamCostMap;
pub use dump::{cost_to_image, energy_to_image};
pub use energy::{DualGradientEnergy, EnergyComputer, EnergyGrid, EnergyKind, SobelEnergy};
pub use error::CarveError;
pub use mask::{ConstraintMask, ConstraintView, FrameMask, MaskPolicy};
pub use remover::{remove_seam, remove_seams};
pub use seam::{extract_seam, extract_seams, Seam, SeamSet};
