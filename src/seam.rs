// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Seams, and finding them in a cost map
//!
//! A seam is a list of x-coordinates that, when mapped with the range
//! (0..height), give the XY coordinates for each pixel to be removed.
//! Walking the cumulative cost map from the bottom row upward recovers
//! the cheapest one.

use crate::costmap::SeamCostMap;
use crate::error::CarveError;
use itertools::Itertools;
use std::ops::Index;

/// One column index per row, top to bottom.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Seam(Vec<u32>);

impl Seam {
    pub fn new(columns: Vec<u32>) -> Self {
        Seam(columns)
    }

    /// The number of rows the seam spans.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn columns(&self) -> &[u32] {
        &self.0
    }

    pub fn into_columns(self) -> Vec<u32> {
        self.0
    }

    /// True when every step between neighbouring rows moves at most one
    /// column.
    pub fn is_connected(&self) -> bool {
        self.0
            .iter()
            .tuple_windows()
            .all(|(a, b)| a.abs_diff(*b) <= 1)
    }

    /// Do the two seams remove the same pixel in any row?
    pub fn overlaps(&self, other: &Seam) -> bool {
        self.0.iter().zip(other.0.iter()).any(|(a, b)| a == b)
    }

    /// Check that the seam can be cut out of a `width`x`height` grid.
    pub(crate) fn check_fits(&self, width: u32, height: u32) -> Result<(), CarveError> {
        if self.0.len() != height as usize {
            return Err(CarveError::InvalidSeam(format!(
                "seam spans {} rows, grid has {}",
                self.0.len(),
                height
            )));
        }
        if let Some((y, x)) = self.0.iter().find_position(|x| **x >= width) {
            return Err(CarveError::InvalidSeam(format!(
                "column {} in row {} is outside a grid {} wide",
                x, y, width
            )));
        }
        Ok(())
    }
}

impl Index<usize> for Seam {
    type Output = u32;

    fn index(&self, y: usize) -> &u32 {
        &self.0[y]
    }
}

impl From<Vec<u32>> for Seam {
    fn from(columns: Vec<u32>) -> Self {
        Seam(columns)
    }
}

/// Several seams pulled from a single cost map.
///
/// As built by [`extract_seams`], no two seams share a pixel, though
/// they may cross between rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeamSet(Vec<Seam>);

impl SeamSet {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Seam> {
        self.0.iter()
    }

    pub fn into_seams(self) -> Vec<Seam> {
        self.0
    }
}

impl From<Vec<Seam>> for SeamSet {
    fn from(seams: Vec<Seam>) -> Self {
        SeamSet(seams)
    }
}

// The first minimum wins, which is the lowest column index for an
// ascending scan.
fn first_minimum<'a>(candidates: impl Iterator<Item = (u32, &'a f32)>) -> Option<(u32, f32)> {
    candidates
        .min_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(x, cost)| (x, *cost))
}

// From a chosen bottom-row column, climb to the top picking the
// cheapest of the (up to) three cells above.  Candidates off either
// edge are simply not considered.
fn walk_upward(cost: &SeamCostMap, start: u32) -> Seam {
    let (width, height) = cost.dimensions();
    let mut column = start;
    (0..height)
        .rev()
        .fold(Vec::<u32>::with_capacity(height as usize), |mut acc, y| {
            if y != height - 1 {
                let lo = column.saturating_sub(1);
                let hi = (column + 1).min(width - 1);
                let row = cost.row(y);
                if let Some((x, _)) = first_minimum((lo..=hi).map(|x| (x, &row[x as usize]))) {
                    column = x;
                }
            }
            acc.push(column);
            acc
        })
        .into_iter()
        .rev()
        .collect::<Vec<_>>()
        .into()
}

/// Find the cheapest seam in a cost map.
pub fn extract_seam(cost: &SeamCostMap) -> Result<Seam, CarveError> {
    let (width, height) = cost.dimensions();
    if height == 0 {
        return Err(CarveError::NoFeasibleSeam { width, height });
    }
    let bottom = cost.row(height - 1);
    match first_minimum((0..width).zip(bottom.iter())) {
        Some((start, total)) if total.is_finite() => {
            let seam = walk_upward(cost, start);
            log::trace!("seam from column {} with cost {}", start, total);
            Ok(seam)
        }
        _ => Err(CarveError::NoFeasibleSeam { width, height }),
    }
}

/// Find up to `k` seams in one cost map, each starting from a different
/// bottom-row column.
///
/// Every start is picked exactly as [`extract_seam`] picks its single
/// start, ignoring columns already taken; each then climbs on its own.
/// Two climbs may meet higher up, and a seam that shares a pixel with an
/// earlier one ends the set there: the seams returned never overlap.
/// Fewer than `k` seams also come back when the bottom row runs out of
/// finite costs.
pub fn extract_seams(cost: &SeamCostMap, k: usize) -> Result<SeamSet, CarveError> {
    let (width, height) = cost.dimensions();
    if height == 0 {
        return Err(CarveError::NoFeasibleSeam { width, height });
    }
    let bottom = cost.row(height - 1);
    let mut taken = vec![false; width as usize];
    let mut seams: Vec<Seam> = Vec::with_capacity(k);

    while seams.len() < k {
        let candidates = (0..width)
            .zip(bottom.iter())
            .filter(|(x, _)| !taken[*x as usize]);
        let start = match first_minimum(candidates) {
            Some((start, total)) if total.is_finite() => start,
            _ => {
                if !seams.is_empty() {
                    log::warn!("asked for {} seams, only {} are feasible", k, seams.len());
                }
                break;
            }
        };
        taken[start as usize] = true;
        let seam = walk_upward(cost, start);
        if seams.iter().any(|earlier| earlier.overlaps(&seam)) {
            log::debug!(
                "seam from column {} meets an earlier one; keeping {} of {}",
                start,
                seams.len(),
                k
            );
            break;
        }
        seams.push(seam);
    }

    if seams.is_empty() {
        return Err(CarveError::NoFeasibleSeam { width, height });
    }
    Ok(SeamSet(seams))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::twodmap::TwoDimensionalMap;

    const INF: f32 = f32::INFINITY;

    fn costs(width: u32, height: u32, cells: Vec<f32>) -> SeamCostMap {
        SeamCostMap::from_cells(TwoDimensionalMap::from_vec(width, height, cells).unwrap())
    }

    #[test]
    fn climbs_through_the_cheapest_neighbours() {
        #[rustfmt::skip]
        let map = costs(5, 4, vec![
            INF, 1.0, 0.0, 3.0, INF,
            INF, 2.0, 1.0, 0.5, INF,
            INF, 1.5, 2.0, 0.7, INF,
            INF, 3.0, 0.9, 1.0, INF,
        ]);
        let seam = extract_seam(&map).unwrap();
        assert_eq!(seam.columns(), &[2, 3, 3, 2]);
        assert!(seam.is_connected());
    }

    #[test]
    fn ties_go_to_the_lowest_column() {
        let map = costs(5, 2, vec![INF, 1.0, 1.0, 1.0, INF, INF, 2.0, 2.0, 2.0, INF]);
        assert_eq!(extract_seam(&map).unwrap().columns(), &[1, 1]);
    }

    #[test]
    fn out_of_range_candidates_are_skipped() {
        // Bottom row picks column 0; the climb must not look at x = -1.
        let map = costs(3, 2, vec![5.0, 1.0, 0.0, 0.0, 1.0, 1.0]);
        assert_eq!(extract_seam(&map).unwrap().columns(), &[1, 0]);
    }

    #[test]
    fn an_all_infinite_bottom_row_has_no_seam() {
        let map = costs(3, 2, vec![INF; 6]);
        assert!(matches!(
            extract_seam(&map),
            Err(CarveError::NoFeasibleSeam { width: 3, height: 2 })
        ));
    }

    #[test]
    fn several_seams_start_on_distinct_columns() {
        #[rustfmt::skip]
        let map = costs(7, 2, vec![
            INF, 0.0, 5.0, 0.0, 5.0, 0.0, INF,
            INF, 0.3, 9.0, 0.1, 9.0, 0.2, INF,
        ]);
        let set = extract_seams(&map, 3).unwrap();
        let starts: Vec<u32> = set.iter().map(|s| s[1]).collect();
        assert_eq!(starts, vec![3, 5, 1]);
        assert_eq!(set.iter().map(|s| s[0]).collect::<Vec<_>>(), vec![3, 5, 1]);
    }

    #[test]
    fn a_seam_meeting_an_earlier_one_ends_the_set() {
        // Starts 2 and 3 both climb into column 2; the second must not be
        // returned, nor anything after it.
        #[rustfmt::skip]
        let map = costs(6, 2, vec![
            INF, 5.0, 0.0, 5.0, 5.0, INF,
            INF, 0.9, 0.1, 0.2, 0.3, INF,
        ]);
        let set = extract_seams(&map, 3).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.iter().next().unwrap().columns(), &[2, 2]);
    }

    #[test]
    fn overlapping_seams() {
        assert!(Seam::new(vec![1, 2, 3]).overlaps(&Seam::new(vec![2, 2, 2])));
        assert!(!Seam::new(vec![1, 2, 3]).overlaps(&Seam::new(vec![2, 3, 4])));
    }

    #[test]
    fn seam_sets_stop_at_infinite_starts() {
        let map = costs(4, 1, vec![INF, 0.2, 0.1, INF]);
        assert_eq!(extract_seams(&map, 10).unwrap().len(), 2);
    }

    #[test]
    fn connectivity_check() {
        assert!(Seam::new(vec![3, 4, 4, 3]).is_connected());
        assert!(!Seam::new(vec![3, 5]).is_connected());
    }
}
