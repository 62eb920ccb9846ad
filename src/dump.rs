// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Greyscale pictures of the intermediate grids, for seeing what the
//! carver sees.

use crate::costmap::SeamCostMap;
use crate::energy::EnergyGrid;
use image::{GrayImage, Luma};
use num_traits::clamp;

// Scale so the largest finite cell is white.  Cells at +∞ (the border
// and protected pixels of a cost map) are white too.
fn to_grey(width: u32, height: u32, cells: &[f32]) -> GrayImage {
    let factor = cells
        .iter()
        .copied()
        .filter(|c| c.is_finite())
        .fold(0.0f32, f32::max);
    GrayImage::from_fn(width, height, |x, y| {
        let cell = cells[(y * width + x) as usize];
        let level = match cell {
            c if !c.is_finite() => 255.0,
            _ if factor <= 0.0 => 0.0,
            c => c / factor * 255.0,
        };
        Luma([clamp(level, 0.0, 255.0).round() as u8])
    })
}

pub fn energy_to_image(energy: &EnergyGrid) -> GrayImage {
    to_grey(energy.width(), energy.height(), energy.as_slice())
}

pub fn cost_to_image(cost: &SeamCostMap) -> GrayImage {
    to_grey(cost.width(), cost.height(), cost.cells().as_slice())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mask::ConstraintView;
    use crate::twodmap::TwoDimensionalMap;

    #[test]
    fn the_brightest_finite_cell_is_white() {
        let energy = TwoDimensionalMap::from_vec(3, 1, vec![0.0, 0.25, 0.5]).unwrap();
        let image = energy_to_image(&energy);
        assert_eq!(image.dimensions(), (3, 1));
        let levels: Vec<u8> = image.pixels().map(|p| p[0]).collect();
        assert_eq!(levels, vec![0, 128, 255]);
    }

    #[test]
    fn a_flat_grid_is_black() {
        let energy = TwoDimensionalMap::filled(2, 2, 0.0);
        assert!(energy_to_image(&energy).pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn cost_map_borders_show_white() {
        let energy = TwoDimensionalMap::filled(4, 3, 0.1);
        let cost = SeamCostMap::build(&energy, &ConstraintView::Unconstrained).unwrap();
        let image = cost_to_image(&cost);
        assert!((0..3).all(|y| image.get_pixel(0, y)[0] == 255 && image.get_pixel(3, y)[0] == 255));
        // The bottom row holds the largest finite totals.
        assert_eq!(image.get_pixel(1, 2)[0], 255);
        assert!(image.get_pixel(1, 0)[0] < 255);
    }
}
