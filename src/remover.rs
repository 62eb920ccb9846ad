// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Seam removal
//!
//! Removing a seam compacts a packed pixel buffer: in every row, the
//! pixels left of the seam are copied as they are, and every pixel at
//! or right of it takes the value of its right-hand neighbour.  The
//! result is one pixel narrower.
//!
//! Every output byte is computed from the *source* buffer alone and
//! written into a distinct destination buffer, so rows are compacted in
//! parallel with exactly one writer per output row and no locks.

use crate::buffer::{PixelBuffer, BYTES_PER_PIXEL};
use crate::error::CarveError;
use crate::parallel;
use crate::seam::{Seam, SeamSet};

/// Remove one seam, producing a buffer one column narrower.
///
/// The output keeps the source's row stride; the pixel slot freed at
/// the end of each row, and any padding, are zeroed.
pub fn remove_seam(buffer: &PixelBuffer, seam: &Seam) -> Result<PixelBuffer, CarveError> {
    let (width, height) = buffer.dimensions();
    if width == 0 {
        return Err(CarveError::InvalidSeam(
            "cannot remove a seam from an empty buffer".to_string(),
        ));
    }
    seam.check_fits(width, height)?;

    let stride = buffer.stride();
    let mut out = PixelBuffer::try_zeroed(width - 1, height, stride)?;
    if stride == 0 || height == 0 {
        return Ok(out);
    }

    let source = buffer.as_bytes();
    let kept = (width as usize - 1) * BYTES_PER_PIXEL;
    parallel::for_each_row(out.as_bytes_mut(), stride, |y, row| {
        let src = &source[y * stride..y * stride + width as usize * BYTES_PER_PIXEL];
        let cut = seam[y] as usize * BYTES_PER_PIXEL;
        row[..cut].copy_from_slice(&src[..cut]);
        row[cut..kept].copy_from_slice(&src[cut + BYTES_PER_PIXEL..]);
    });
    Ok(out)
}

/// Re-express a seam set as a sequence of single seams, each in the
/// coordinates of the buffer left behind by the ones before it.
///
/// A column to the right of an earlier seam's pixel in the same row
/// moves one step left for each such pixel.  Seams that share a pixel
/// are refused: there is no telling which pixel the later one should
/// take in its place.
pub fn sequential_seams(set: &SeamSet) -> Result<Vec<Seam>, CarveError> {
    let mut earlier: Vec<&Seam> = Vec::with_capacity(set.len());
    let mut sequence = Vec::with_capacity(set.len());
    for seam in set.iter() {
        if let Some(index) = earlier.iter().position(|e| e.overlaps(seam)) {
            return Err(CarveError::InvalidSeam(format!(
                "seam {} of the set shares a pixel with seam {}",
                earlier.len(),
                index
            )));
        }
        let adjusted: Vec<u32> = seam
            .columns()
            .iter()
            .enumerate()
            .map(|(y, x)| x - earlier.iter().filter(|e| e[y] < *x).count() as u32)
            .collect();
        sequence.push(Seam::new(adjusted));
        earlier.push(seam);
    }
    Ok(sequence)
}

/// Remove every seam of a set, one after another.  The seams are first
/// rewritten with [`sequential_seams`].
pub fn remove_seams(buffer: &PixelBuffer, set: &SeamSet) -> Result<PixelBuffer, CarveError> {
    sequential_seams(set)?
        .iter()
        .try_fold(buffer.clone(), |carved, seam| remove_seam(&carved, seam))
}

#[cfg(test)]
mod tests {
    use super::*;

    // Pixel (x, y) is [x, y, 7, 255]; rows are padded to `stride`.
    fn numbered(width: u32, height: u32, stride: usize) -> PixelBuffer {
        let mut data = vec![0xAB; stride * height as usize];
        for y in 0..height as usize {
            for x in 0..width as usize {
                let at = y * stride + x * 4;
                data[at..at + 4].copy_from_slice(&[x as u8, y as u8, 7, 255]);
            }
        }
        PixelBuffer::from_raw(width, height, 4, stride, data).unwrap()
    }

    fn columns_of_row(buffer: &PixelBuffer, y: u32) -> Vec<u8> {
        (0..buffer.width()).map(|x| buffer.pixel(x, y)[0]).collect()
    }

    #[test]
    fn removal_deletes_exactly_the_seam_pixel() {
        let buffer = numbered(5, 3, 20);
        let carved = remove_seam(&buffer, &Seam::new(vec![0, 2, 4])).unwrap();
        assert_eq!(carved.dimensions(), (4, 3));
        assert_eq!(columns_of_row(&carved, 0), vec![1, 2, 3, 4]);
        assert_eq!(columns_of_row(&carved, 1), vec![0, 1, 3, 4]);
        assert_eq!(columns_of_row(&carved, 2), vec![0, 1, 2, 3]);
        assert!((0..3).all(|y| carved.pixel(0, y)[1] == y as u8));
    }

    #[test]
    fn padded_buffers_keep_their_stride() {
        let buffer = numbered(4, 2, 4 * 4 + 12);
        let carved = remove_seam(&buffer, &Seam::new(vec![1, 1])).unwrap();
        assert_eq!(carved.stride(), buffer.stride());
        assert_eq!(columns_of_row(&carved, 1), vec![0, 2, 3]);
        // The freed slot and the padding are cleared, not left stale.
        let tail = &carved.as_bytes()[carved.stride() + 12..2 * carved.stride()];
        assert!(tail.iter().all(|b| *b == 0));
    }

    #[test]
    fn seams_that_do_not_fit_are_refused() {
        let buffer = numbered(3, 2, 12);
        assert!(remove_seam(&buffer, &Seam::new(vec![1])).is_err());
        assert!(remove_seam(&buffer, &Seam::new(vec![1, 3])).is_err());
    }

    #[test]
    fn seam_sets_are_rewritten_into_shrinking_coordinates() {
        let set = SeamSet::from(vec![Seam::new(vec![2, 2]), Seam::new(vec![5, 1])]);
        let sequence = sequential_seams(&set).unwrap();
        assert_eq!(sequence[0].columns(), &[2, 2]);
        assert_eq!(sequence[1].columns(), &[4, 1]);
    }

    #[test]
    fn seams_sharing_a_pixel_are_refused() {
        let set = SeamSet::from(vec![Seam::new(vec![2, 3]), Seam::new(vec![4, 3])]);
        assert!(matches!(
            remove_seams(&numbered(6, 2, 24), &set),
            Err(CarveError::InvalidSeam(_))
        ));
    }

    #[test]
    fn removing_a_set_matches_removing_its_seams_by_hand() {
        let buffer = numbered(8, 2, 32);
        let set = SeamSet::from(vec![Seam::new(vec![1, 2]), Seam::new(vec![6, 5])]);
        let batched = remove_seams(&buffer, &set).unwrap();
        let by_hand = remove_seam(
            &remove_seam(&buffer, &Seam::new(vec![1, 2])).unwrap(),
            &Seam::new(vec![5, 4]),
        )
        .unwrap();
        assert_eq!(batched, by_hand);
        assert_eq!(columns_of_row(&batched, 0), vec![0, 2, 3, 4, 5, 7]);
    }
}
