// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Constraint masks
//!
//! A mask marks the pixels a seam may never pass through, such as the
//! border of a decorative frame around the image being carved.  It has
//! to stay aligned with the pixel buffer through every removal and
//! every transpose, and there are two ways of doing that; see
//! [`MaskPolicy`].

use crate::buffer::PixelBuffer;
use crate::error::CarveError;
use crate::seam::Seam;
use crate::twodmap::TwoDimensionalMap;
use itertools::iproduct;

/// Mask value for a pixel seams may pass through.
pub const FREE: u8 = 0;
/// Mask value for a pixel seams must avoid.
pub const PROTECTED: u8 = 255;

/// A per-pixel byte grid of [`FREE`] and [`PROTECTED`] cells.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintMask {
    cells: TwoDimensionalMap<u8>,
}

impl ConstraintMask {
    /// A mask with nothing protected.
    pub fn new(width: u32, height: u32) -> Self {
        ConstraintMask {
            cells: TwoDimensionalMap::filled(width, height, FREE),
        }
    }

    /// Wrap a raw byte grid; any value other than [`PROTECTED`] counts
    /// as free.
    pub fn from_vec(width: u32, height: u32, cells: Vec<u8>) -> Result<Self, CarveError> {
        Ok(ConstraintMask {
            cells: TwoDimensionalMap::from_vec(width, height, cells)?,
        })
    }

    /// Derive a mask from an alpha channel: fully opaque pixels are
    /// protected, everything else is free.
    pub fn from_alpha(buffer: &PixelBuffer) -> Self {
        let (width, height) = buffer.dimensions();
        let mut cells = TwoDimensionalMap::filled(width, height, FREE);
        for (y, x) in iproduct!(0..height, 0..width) {
            if buffer.pixel(x, y)[3] == 255 {
                cells[(x, y)] = PROTECTED;
            }
        }
        ConstraintMask { cells }
    }

    pub fn width(&self) -> u32 {
        self.cells.width()
    }

    pub fn height(&self) -> u32 {
        self.cells.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.cells.dimensions()
    }

    pub fn is_protected(&self, x: u32, y: u32) -> bool {
        self.cells[(x, y)] == PROTECTED
    }

    pub fn protect(&mut self, x: u32, y: u32) {
        self.cells[(x, y)] = PROTECTED;
    }

    pub fn protected_count(&self) -> usize {
        self.cells.as_slice().iter().filter(|c| **c == PROTECTED).count()
    }

    pub fn transposed(&self) -> Result<Self, CarveError> {
        Ok(ConstraintMask {
            cells: self.cells.transposed()?,
        })
    }

    /// Delete the same cells a seam removes from the pixel buffer.
    pub fn without_seam(&self, seam: &Seam) -> Result<Self, CarveError> {
        Ok(ConstraintMask {
            cells: self.cells.without_seam(seam)?,
        })
    }
}

/// How the mask follows the buffer as it shrinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MaskPolicy {
    /// Every seam removed from the buffer is removed from the mask too,
    /// so the two always have the same dimensions.
    #[default]
    Lockstep,
    /// The mask stays at the original frame size, and lookups are
    /// shifted past the removed region.
    ///
    /// This assumes the removable region is centred and that seams come
    /// out of one side of it.  It only holds for frame layouts where
    /// that is true; prefer [`MaskPolicy::Lockstep`].
    FrameRemap,
}

/// A constraint mask as ingested from a frame: the protected grid at
/// the frame's original size, plus where the inset image starts.
#[derive(Debug, Clone)]
pub struct FrameMask {
    mask: ConstraintMask,
    inset_origin: (u32, u32),
}

impl FrameMask {
    /// The inset origin must lie inside the mask on a free pixel, since
    /// that is where carving happens.
    pub fn new(mask: ConstraintMask, inset_origin: (u32, u32)) -> Result<Self, CarveError> {
        let (x, y) = inset_origin;
        let (width, height) = mask.dimensions();
        if x >= width || y >= height {
            return Err(CarveError::InvalidInput(format!(
                "inset origin {:?} lies outside a {}x{} mask",
                inset_origin, width, height
            )));
        }
        if mask.is_protected(x, y) {
            return Err(CarveError::InvalidInput(format!(
                "inset origin {:?} is a protected pixel",
                inset_origin
            )));
        }
        Ok(FrameMask { mask, inset_origin })
    }

    pub fn mask(&self) -> &ConstraintMask {
        &self.mask
    }

    pub fn inset_origin(&self) -> (u32, u32) {
        self.inset_origin
    }

    pub fn into_mask(self) -> ConstraintMask {
        self.mask
    }
}

impl From<ConstraintMask> for FrameMask {
    fn from(mask: ConstraintMask) -> Self {
        FrameMask {
            mask,
            inset_origin: (0, 0),
        }
    }
}

/// A mask as seen from a working grid of a given size.
#[derive(Debug, Clone, Copy)]
pub enum ConstraintView<'a> {
    /// Nothing is protected.
    Unconstrained,
    /// The mask has the working grid's dimensions.
    Aligned(&'a ConstraintMask),
    /// The mask is larger than the working grid; see
    /// [`MaskPolicy::FrameRemap`].
    Remapped(&'a ConstraintMask),
}

impl<'a> ConstraintView<'a> {
    pub fn new(mask: Option<&'a ConstraintMask>, policy: MaskPolicy) -> Self {
        match (mask, policy) {
            (None, _) => ConstraintView::Unconstrained,
            (Some(mask), MaskPolicy::Lockstep) => ConstraintView::Aligned(mask),
            (Some(mask), MaskPolicy::FrameRemap) => ConstraintView::Remapped(mask),
        }
    }

    /// Is working cell (x, y) of a `width`x`height` grid protected?
    pub fn is_protected(&self, x: u32, y: u32, width: u32, height: u32) -> bool {
        match self {
            ConstraintView::Unconstrained => false,
            ConstraintView::Aligned(mask) => mask.is_protected(x, y),
            ConstraintView::Remapped(mask) => {
                let (mw, mh) = mask.dimensions();
                let mx = if x > width / 2 {
                    x + mw.saturating_sub(width)
                } else {
                    x
                };
                let my = if y > height / 2 {
                    y + mh.saturating_sub(height)
                } else {
                    y
                };
                mx < mw && my < mh && mask.is_protected(mx, my)
            }
        }
    }
}
