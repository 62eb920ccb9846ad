// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The cumulative cost map
//!
//! Every cell holds the cheapest total energy of any connected path
//! from the top row down to it:
//!
//! ```text
//!  cost(x,0) = E(x,0)
//!  cost(x,y) = E(x,y) + min ⎧ cost(x−1,y−1)
//!                           ⎨ cost(x,  y−1)
//!                           ⎩ cost(x+1,y−1)
//! ```
//!
//! Neighbours off the edge of the map are left out of the minimum.
//! The first and last columns, and every protected pixel, are `+∞` so
//! that no seam can ever touch them.
//!
//! Each row depends only on the one above it, so rows are built in
//! strict top-to-bottom order while the cells within a wide row are
//! shared out among workers.

use crate::energy::EnergyGrid;
use crate::error::CarveError;
use crate::mask::ConstraintView;
use crate::parallel;
use crate::seam::Seam;
use crate::twodmap::TwoDimensionalMap;
use std::ops::RangeInclusive;

/// Rows narrower than this are built on the calling thread.
const PARALLEL_ROW_WIDTH: usize = 4096;

/// The cumulative minimum-cost grid that seams are read out of.
#[derive(Debug, Clone, PartialEq)]
pub struct SeamCostMap {
    cells: TwoDimensionalMap<f32>,
}

impl SeamCostMap {
    pub(crate) fn from_cells(cells: TwoDimensionalMap<f32>) -> Self {
        SeamCostMap { cells }
    }

    /// Build the whole map from scratch.
    pub fn build(energy: &EnergyGrid, mask: &ConstraintView<'_>) -> Result<Self, CarveError> {
        let (width, height) = energy.dimensions();
        let mut map = SeamCostMap {
            cells: TwoDimensionalMap::try_new(width, height)?,
        };
        let last = width.saturating_sub(1);
        map.fill_band(energy, mask, |_| 0..=last);
        Ok(map)
    }

    /// Bring the map up to date after `removed` was carved out of the
    /// image it was built for.
    ///
    /// The old map is compacted along the seam, and only the cells that
    /// sit in a triangle widening downward from the seam,
    /// `x ∈ [seam[y]−y−1, seam[y]+y]`, are recomputed.  This is an
    /// approximation: cells outside the band keep their old totals even
    /// where those could have changed.  With no previous map the band is
    /// the whole grid, and this is exactly [`SeamCostMap::build`].
    pub fn rebuild(
        previous: Option<&SeamCostMap>,
        removed: Option<&Seam>,
        energy: &EnergyGrid,
        mask: &ConstraintView<'_>,
    ) -> Result<Self, CarveError> {
        let (previous, removed) = match (previous, removed) {
            (Some(previous), Some(removed)) => (previous, removed),
            _ => return Self::build(energy, mask),
        };

        let (width, height) = energy.dimensions();
        if previous.dimensions() != (width + 1, height) || removed.len() != height as usize {
            return Err(CarveError::DimensionMismatch {
                expected: (width + 1, height),
                found: previous.dimensions(),
            });
        }

        let mut map = SeamCostMap {
            cells: previous.cells.without_seam(removed)?,
        };
        let last = i64::from(width) - 1;
        map.fill_band(energy, mask, |y| {
            let centre = i64::from(removed[y as usize]);
            let reach = i64::from(y);
            let lo = (centre - reach - 1).max(0);
            let hi = (centre + reach).min(last);
            lo as u32..=hi as u32
        });
        Ok(map)
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

    pub fn row(&self, y: u32) -> &[f32] {
        self.cells.row(y)
    }

    pub fn cells(&self) -> &TwoDimensionalMap<f32> {
        &self.cells
    }

    // Recompute, row by row, the cells that `band` names for each row,
    // plus the two border columns which must always be infinite.
    fn fill_band<B>(&mut self, energy: &EnergyGrid, mask: &ConstraintView<'_>, band: B)
    where
        B: Fn(u32) -> RangeInclusive<u32>,
    {
        let (width, height) = energy.dimensions();
        if width == 0 {
            return;
        }
        let row_len = width as usize;
        let cells = self.cells.as_mut_slice();

        for y in 0..height {
            let (above, rest) = cells.split_at_mut(y as usize * row_len);
            let above = if y == 0 {
                None
            } else {
                Some(&above[above.len() - row_len..])
            };
            let current = &mut rest[..row_len];
            let energy_row = energy.row(y);

            let span = band(y);
            let (start, end) = (*span.start() as usize, *span.end() as usize);
            if start <= end && end < row_len {
                let cell = |x: usize| cell_cost(x, y, width, height, energy_row, above, mask);
                let segment = &mut current[start..=end];
                if segment.len() >= PARALLEL_ROW_WIDTH {
                    parallel::for_each_band(segment, 1, |offset, run| {
                        for (i, c) in run.iter_mut().enumerate() {
                            *c = cell(start + offset + i);
                        }
                    });
                } else {
                    for (i, c) in segment.iter_mut().enumerate() {
                        *c = cell(start + i);
                    }
                }
            }

            current[0] = f32::INFINITY;
            current[row_len - 1] = f32::INFINITY;
        }
    }
}

// The recurrence for a single cell.
fn cell_cost(
    x: usize,
    y: u32,
    width: u32,
    height: u32,
    energy_row: &[f32],
    above: Option<&[f32]>,
    mask: &ConstraintView<'_>,
) -> f32 {
    let last = width as usize - 1;
    if x == 0 || x == last || mask.is_protected(x as u32, y, width, height) {
        return f32::INFINITY;
    }
    match above {
        None => energy_row[x],
        Some(above) => {
            let lo = x.saturating_sub(1);
            let hi = (x + 1).min(last);
            let parent = above[lo..=hi]
                .iter()
                .copied()
                .fold(f32::INFINITY, f32::min);
            energy_row[x] + parent
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mask::{ConstraintMask, MaskPolicy};

    const INF: f32 = f32::INFINITY;

    fn energy(width: u32, height: u32, cells: Vec<f32>) -> EnergyGrid {
        TwoDimensionalMap::from_vec(width, height, cells).unwrap()
    }

    #[test]
    fn recurrence_sums_the_cheapest_parent() {
        #[rustfmt::skip]
        let e = energy(5, 3, vec![
            0.1, 0.2, 0.3, 0.4, 0.5,
            0.5, 0.1, 0.5, 0.1, 0.5,
            0.9, 0.9, 0.2, 0.9, 0.9,
        ]);
        let map = SeamCostMap::build(&e, &ConstraintView::Unconstrained).unwrap();
        assert_eq!(map.row(0), &[INF, 0.2, 0.3, 0.4, INF]);
        assert_eq!(map.row(1), &[INF, 0.1 + 0.2, 0.5 + 0.2, 0.1 + 0.3, INF]);
        assert_eq!(map.row(2)[2], 0.2 + (0.1 + 0.2));
        assert_eq!(map.row(2)[0], INF);
        assert_eq!(map.row(2)[4], INF);
    }

    #[test]
    fn protected_cells_are_infinite() {
        let e = energy(4, 2, vec![0.0; 8]);
        let mut mask = ConstraintMask::new(4, 2);
        mask.protect(1, 0);
        let view = ConstraintView::new(Some(&mask), MaskPolicy::Lockstep);
        let map = SeamCostMap::build(&e, &view).unwrap();
        assert_eq!(map.row(0), &[INF, INF, 0.0, INF]);
        assert_eq!(map.row(1), &[INF, 0.0, 0.0, INF]);
    }

    #[test]
    fn rebuild_without_history_is_a_full_build() {
        let cells: Vec<f32> = (0..48).map(|i| ((i * 7) % 11) as f32 / 10.0).collect();
        let e = energy(8, 6, cells);
        let view = ConstraintView::Unconstrained;
        let full = SeamCostMap::build(&e, &view).unwrap();
        assert_eq!(SeamCostMap::rebuild(None, None, &e, &view).unwrap(), full);
    }

    #[test]
    fn rebuild_only_touches_the_band() {
        let e = energy(6, 3, vec![0.5; 18]);
        let view = ConstraintView::Unconstrained;
        let previous = SeamCostMap::from_cells(TwoDimensionalMap::filled(7, 3, 9.0));
        let removed = Seam::new(vec![4, 4, 4]);
        let map = SeamCostMap::rebuild(Some(&previous), Some(&removed), &e, &view).unwrap();
        // Row 0: band is [3, 4]; row 1: [2, 5]; row 2: [1, 5].
        assert_eq!(map.row(0), &[INF, 9.0, 9.0, 0.5, 0.5, INF]);
        assert_eq!(map.row(1), &[INF, 9.0, 1.0, 1.0, 1.0, INF]);
        assert_eq!(map.row(2), &[INF, 1.5, 1.5, 1.5, 1.5, INF]);
    }

    #[test]
    fn rebuild_refuses_a_map_of_the_wrong_size() {
        let e = energy(4, 2, vec![0.5; 8]);
        let previous = SeamCostMap::from_cells(TwoDimensionalMap::filled(4, 2, 0.0));
        let removed = Seam::new(vec![1, 1]);
        let outcome = SeamCostMap::rebuild(
            Some(&previous),
            Some(&removed),
            &e,
            &ConstraintView::Unconstrained,
        );
        assert!(matches!(outcome, Err(CarveError::DimensionMismatch { .. })));
    }

    #[test]
    fn wide_rows_build_the_same_in_parallel() {
        let width = PARALLEL_ROW_WIDTH as u32 + 37;
        let cells: Vec<f32> = (0..width * 3).map(|i| (i % 13) as f32 / 13.0).collect();
        let e = energy(width, 3, cells);
        let map = SeamCostMap::build(&e, &ConstraintView::Unconstrained).unwrap();
        for x in 1..(width - 1) {
            let above = &map.row(1)[(x - 1) as usize..=(x + 1) as usize];
            let parent = above.iter().copied().fold(INF, f32::min);
            assert_eq!(map.row(2)[x as usize], e[(x, 2)] + parent);
        }
    }
}
