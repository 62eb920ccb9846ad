// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Two-dimensional maps
//!
//! The energy grid, the constraint mask and the cumulative cost map are
//! all the same thing underneath: a dense, row-major field of one value
//! per pixel.  They also all have to follow the pixel buffer through
//! every seam removal and every transpose, so those operations live
//! here once.

use crate::error::CarveError;
use crate::parallel;
use crate::seam::Seam;
use std::ops::{Index, IndexMut};

/// An addressable two-dimensional field of `P`, one per pixel.
#[derive(Debug, Clone, PartialEq)]
pub struct TwoDimensionalMap<P: Default + Copy> {
    width: u32,
    height: u32,
    cells: Vec<P>,
}

/// Reserve exactly `len` cells, turning allocator failure into an error
/// instead of an abort.
pub(crate) fn try_alloc<P: Default + Copy>(len: usize) -> Result<Vec<P>, CarveError> {
    let mut cells = Vec::new();
    cells
        .try_reserve_exact(len)
        .map_err(|_| CarveError::ResourceExhaustion {
            bytes: len.saturating_mul(std::mem::size_of::<P>()),
        })?;
    cells.resize(len, P::default());
    Ok(cells)
}

impl<P: Default + Copy> TwoDimensionalMap<P> {
    /// A map of the given size with every cell at `P::default()`.
    pub fn new(width: u32, height: u32) -> Self {
        TwoDimensionalMap {
            width,
            height,
            cells: vec![P::default(); width as usize * height as usize],
        }
    }

    /// A map of the given size with every cell at `value`.
    pub fn filled(width: u32, height: u32, value: P) -> Self {
        TwoDimensionalMap {
            width,
            height,
            cells: vec![value; width as usize * height as usize],
        }
    }

    /// Wrap an existing row-major vector.
    pub fn from_vec(width: u32, height: u32, cells: Vec<P>) -> Result<Self, CarveError> {
        if cells.len() != width as usize * height as usize {
            return Err(CarveError::InvalidInput(format!(
                "{} cells cannot form a {}x{} map",
                cells.len(),
                width,
                height
            )));
        }
        Ok(TwoDimensionalMap {
            width,
            height,
            cells,
        })
    }

    pub(crate) fn try_new(width: u32, height: u32) -> Result<Self, CarveError> {
        Ok(TwoDimensionalMap {
            width,
            height,
            cells: try_alloc(width as usize * height as usize)?,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    // Absolutely, the number one name of this game is keep the index
    // math in a singular location and never, ever mess with it.
    fn get_index(&self, x: u32, y: u32) -> usize {
        (y as usize) * (self.width as usize) + (x as usize)
    }

    /// One row of the map.
    pub fn row(&self, y: u32) -> &[P] {
        let start = self.get_index(0, y);
        &self.cells[start..start + self.width as usize]
    }

    pub fn row_mut(&mut self, y: u32) -> &mut [P] {
        let start = self.get_index(0, y);
        let width = self.width as usize;
        &mut self.cells[start..start + width]
    }

    pub fn as_slice(&self) -> &[P] {
        &self.cells
    }

    pub fn as_mut_slice(&mut self) -> &mut [P] {
        &mut self.cells
    }

    pub fn into_vec(self) -> Vec<P> {
        self.cells
    }

    /// The same field with rows and columns exchanged: cell (x, y)
    /// becomes cell (y, x).
    pub fn transposed(&self) -> Result<Self, CarveError>
    where
        P: Send + Sync,
    {
        let mut out = Self::try_new(self.height, self.width)?;
        let source = &self.cells;
        let (src_width, out_width) = (self.width as usize, self.height as usize);
        if out_width > 0 {
            parallel::for_each_row(&mut out.cells, out_width, |x, row| {
                for (y, cell) in row.iter_mut().enumerate() {
                    *cell = source[y * src_width + x];
                }
            });
        }
        Ok(out)
    }

    /// The same field one column narrower, with the cell at `seam[y]`
    /// deleted from every row and everything to its right shifted left.
    pub fn without_seam(&self, seam: &Seam) -> Result<Self, CarveError>
    where
        P: Send + Sync,
    {
        seam.check_fits(self.width, self.height)?;
        let mut out = Self::try_new(self.width - 1, self.height)?;
        let (src_width, out_width) = (self.width as usize, self.width as usize - 1);
        let source = &self.cells;
        if out_width > 0 {
            parallel::for_each_row(&mut out.cells, out_width, |y, row| {
                let src = &source[y * src_width..(y + 1) * src_width];
                let cut = seam[y] as usize;
                row[..cut].copy_from_slice(&src[..cut]);
                row[cut..].copy_from_slice(&src[cut + 1..]);
            });
        }
        Ok(out)
    }
}

impl<P: Default + Copy> Index<(u32, u32)> for TwoDimensionalMap<P> {
    type Output = P;

    /// A convenience addressing mode for getting values.
    fn index(&self, (x, y): (u32, u32)) -> &P {
        let index = self.get_index(x, y);
        &self.cells[index]
    }
}

impl<P: Default + Copy> IndexMut<(u32, u32)> for TwoDimensionalMap<P> {
    /// A convenience addressing mode for setting values.
    fn index_mut(&mut self, (x, y): (u32, u32)) -> &mut P {
        let index = self.get_index(x, y);
        &mut self.cells[index]
    }
}
