// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Calculate the energy of an image
//!
//! Given a pixel buffer, calculate a map of how much each pixel matters:
//! the local gradient magnitude of its luma, normalized into [0, 1].
//! Low energy is cheap to carve away.
//!
//! The energy of every pixel depends only on its read-only neighbours,
//! so each row of the output is written by whichever worker owns it,
//! with no shared mutable state.  Any backend that honours the
//! [`EnergyComputer`] contract can stand in for the two kernels here.

use crate::buffer::{PixelBuffer, BYTES_PER_PIXEL};
use crate::error::CarveError;
use crate::parallel;
use crate::twodmap::TwoDimensionalMap;
use image::{Pixel, Rgba};
use num_traits::clamp;

/// One normalized energy value per pixel.
pub type EnergyGrid = TwoDimensionalMap<f32>;

/// Anything that can turn a pixel buffer into an energy grid.
///
/// Implementations must be deterministic and must produce a grid with
/// the buffer's dimensions, every value in [0, 1].
pub trait EnergyComputer: Sync {
    fn compute(&self, buffer: &PixelBuffer) -> Result<EnergyGrid, CarveError>;
}

// Pixel -> Luma, through the image crate's own weights.
fn luma_plane(buffer: &PixelBuffer) -> Result<TwoDimensionalMap<i32>, CarveError> {
    let mut plane = TwoDimensionalMap::<i32>::try_new(buffer.width(), buffer.height())?;
    let width = buffer.width() as usize;
    if width > 0 {
        parallel::for_each_row(plane.as_mut_slice(), width, |y, row| {
            let source = buffer.row(y as u32).chunks_exact(BYTES_PER_PIXEL);
            for (cell, px) in row.iter_mut().zip(source) {
                let rgba = Rgba([px[0], px[1], px[2], px[3]]);
                *cell = i32::from(rgba.to_luma().0[0]);
            }
        });
    }
    Ok(plane)
}

// Fill an energy grid row by row from a luma plane, with `kernel`
// receiving a sampler that clamps coordinates to the image edge.
fn fill_energy<K>(luma: &TwoDimensionalMap<i32>, kernel: K) -> Result<EnergyGrid, CarveError>
where
    K: Fn(&dyn Fn(i64, i64) -> i32) -> f32 + Sync,
{
    let (width, height) = luma.dimensions();
    let mut grid = EnergyGrid::try_new(width, height)?;
    if width == 0 || height == 0 {
        return Ok(grid);
    }
    let (mw, mh) = (i64::from(width) - 1, i64::from(height) - 1);
    parallel::for_each_row(grid.as_mut_slice(), width as usize, |y, row| {
        for (x, cell) in row.iter_mut().enumerate() {
            let (cx, cy) = (x as i64, y as i64);
            let sample = |dx: i64, dy: i64| -> i32 {
                let sx = clamp(cx + dx, 0, mw) as u32;
                let sy = clamp(cy + dy, 0, mh) as u32;
                luma[(sx, sy)]
            };
            *cell = clamp(kernel(&sample), 0.0, 1.0);
        }
    });
    Ok(grid)
}

/// The Sobel gradient magnitude of luma, with edge pixels replicated.
#[derive(Debug, Default, Clone, Copy)]
pub struct SobelEnergy;

// The largest magnitude a 3x3 Sobel pair can produce on 8-bit input.
const SOBEL_MAX: f32 = 4.0 * 255.0 * std::f32::consts::SQRT_2;

impl EnergyComputer for SobelEnergy {
    fn compute(&self, buffer: &PixelBuffer) -> Result<EnergyGrid, CarveError> {
        let luma = luma_plane(buffer)?;
        fill_energy(&luma, |p| {
            let gx = (p(1, -1) + 2 * p(1, 0) + p(1, 1)) - (p(-1, -1) + 2 * p(-1, 0) + p(-1, 1));
            let gy = (p(-1, 1) + 2 * p(0, 1) + p(1, 1)) - (p(-1, -1) + 2 * p(0, -1) + p(1, -1));
            ((gx * gx + gy * gy) as f32).sqrt() / SOBEL_MAX
        })
    }
}

/// The dual-gradient energy: the squared luma difference between the
/// left and right neighbours plus that between the upper and lower
/// ones.  With the `square_root` feature, the square root of that sum.
#[derive(Debug, Default, Clone, Copy)]
pub struct DualGradientEnergy;

// (Luma, Luma) -> Energy
#[inline]
fn energy_of_pair(l1: i32, l2: i32) -> i32 {
    let css = l1 - l2;
    css * css
}

#[cfg(not(feature = "square_root"))]
fn normalize_dual(raw: i32) -> f32 {
    raw as f32 / (2.0 * 255.0 * 255.0)
}

#[cfg(feature = "square_root")]
fn normalize_dual(raw: i32) -> f32 {
    (raw as f32).sqrt() / (255.0 * std::f32::consts::SQRT_2)
}

impl EnergyComputer for DualGradientEnergy {
    fn compute(&self, buffer: &PixelBuffer) -> Result<EnergyGrid, CarveError> {
        let luma = luma_plane(buffer)?;
        fill_energy(&luma, |p| {
            normalize_dual(energy_of_pair(p(-1, 0), p(1, 0)) + energy_of_pair(p(0, -1), p(0, 1)))
        })
    }
}

/// Which built-in kernel to use, for callers that pick one by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnergyKind {
    #[default]
    Sobel,
    DualGradient,
}

impl EnergyComputer for EnergyKind {
    fn compute(&self, buffer: &PixelBuffer) -> Result<EnergyGrid, CarveError> {
        match self {
            EnergyKind::Sobel => SobelEnergy.compute(buffer),
            EnergyKind::DualGradient => DualGradientEnergy.compute(buffer),
        }
    }
}

impl std::str::FromStr for EnergyKind {
    type Err = CarveError;

    fn from_str(name: &str) -> Result<Self, CarveError> {
        match name {
            "sobel" => Ok(EnergyKind::Sobel),
            "dual-gradient" | "gradient" => Ok(EnergyKind::DualGradient),
            other => Err(CarveError::InvalidInput(format!(
                "unknown energy function {:?}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const IMAGE_DATA: [u8; 20] = [9, 9, 0, 9, 9, 9, 1, 9, 8, 9, 9, 9, 9, 9, 0, 9, 9, 9, 0, 9];
    const IMAGE_ENERGY: [i32; 20] = [
        0, 145, 81, 82, 0, 64, 0, 130, 0, 82, 0, 64, 0, 145, 81, 0, 0, 81, 81, 162,
    ];

    fn grey(width: u32, height: u32, levels: &[u8]) -> PixelBuffer {
        let data = levels.iter().flat_map(|v| [*v, *v, *v, 255]).collect();
        PixelBuffer::from_raw(width, height, 4, width as usize * 4, data).unwrap()
    }

    #[test]
    fn dual_gradient_matches_hand_computed_energies() {
        let energy = DualGradientEnergy.compute(&grey(5, 4, &IMAGE_DATA)).unwrap();
        for (got, raw) in energy.as_slice().iter().zip(IMAGE_ENERGY.iter()) {
            assert_relative_eq!(*got, normalize_dual(*raw));
        }
    }

    #[test]
    fn flat_images_have_no_energy() {
        let buffer = grey(6, 5, &[128; 30]);
        for kind in [EnergyKind::Sobel, EnergyKind::DualGradient] {
            let energy = kind.compute(&buffer).unwrap();
            assert_eq!(energy.dimensions(), (6, 5));
            assert!(energy.as_slice().iter().all(|e| *e == 0.0));
        }
    }

    #[test]
    fn sobel_finds_a_vertical_edge() {
        // Black on the left three columns, white on the right three.
        let levels: Vec<u8> = (0..36).map(|i| if i % 6 < 3 { 0 } else { 255 }).collect();
        let energy = SobelEnergy.compute(&grey(6, 6, &levels)).unwrap();
        for y in 0..6 {
            assert_eq!(energy[(0, y)], 0.0);
            assert_eq!(energy[(5, y)], 0.0);
            assert!(energy[(2, y)] > 0.5);
            assert!(energy[(3, y)] > 0.5);
        }
        assert!(energy.as_slice().iter().all(|e| (0.0..=1.0).contains(e)));
    }

    #[test]
    fn energy_ignores_row_padding() {
        let stride = 5 * 4 + 8;
        let mut data = vec![0xFF; stride * 4];
        for (i, v) in IMAGE_DATA.iter().enumerate() {
            let at = (i / 5) * stride + (i % 5) * 4;
            data[at..at + 4].copy_from_slice(&[*v, *v, *v, 255]);
        }
        let padded = PixelBuffer::from_raw(5, 4, 4, stride, data).unwrap();
        let packed = grey(5, 4, &IMAGE_DATA);
        assert_eq!(
            SobelEnergy.compute(&padded).unwrap(),
            SobelEnergy.compute(&packed).unwrap()
        );
    }

    #[test]
    fn energy_kinds_parse_by_name() {
        assert_eq!("sobel".parse::<EnergyKind>().unwrap(), EnergyKind::Sobel);
        assert_eq!(
            "dual-gradient".parse::<EnergyKind>().unwrap(),
            EnergyKind::DualGradient
        );
        assert!("laplace".parse::<EnergyKind>().is_err());
    }
}
