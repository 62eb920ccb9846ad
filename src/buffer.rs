// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Packed RGBA pixel buffers
//!
//! The carver works directly on packed RGBA8 memory.  Rows may carry
//! padding past their last pixel (`stride > width * 4`), and nothing in
//! here assumes otherwise: every row is addressed through the stride.

use crate::error::CarveError;
use crate::parallel;
use crate::twodmap::try_alloc;
use image::{ColorType, DynamicImage, RgbaImage};

/// Bytes in one RGBA8 pixel.
pub const BYTES_PER_PIXEL: usize = 4;

/// A packed, row-major RGBA8 image with an explicit row stride.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    stride: usize,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Ingest raw pixel memory.
    ///
    /// Refuses anything that is not 4 bytes per pixel, a stride too
    /// short to hold a row, or data too short to hold every row.
    pub fn from_raw(
        width: u32,
        height: u32,
        bytes_per_pixel: usize,
        stride: usize,
        data: Vec<u8>,
    ) -> Result<Self, CarveError> {
        if bytes_per_pixel != BYTES_PER_PIXEL {
            return Err(CarveError::BufferFormat(format!(
                "{} bytes per pixel; only packed RGBA8 is supported",
                bytes_per_pixel
            )));
        }
        let row_bytes = width as usize * BYTES_PER_PIXEL;
        if stride < row_bytes {
            return Err(CarveError::BufferFormat(format!(
                "stride of {} bytes cannot hold {} pixels",
                stride, width
            )));
        }
        let needed = stride * height as usize;
        if data.len() < needed {
            return Err(CarveError::BufferFormat(format!(
                "{} bytes supplied, {}x{} at stride {} needs {}",
                data.len(),
                width,
                height,
                stride,
                needed
            )));
        }
        let mut data = data;
        data.truncate(needed);
        Ok(PixelBuffer {
            width,
            height,
            stride,
            data,
        })
    }

    /// A zeroed buffer with the given stride.
    pub(crate) fn try_zeroed(width: u32, height: u32, stride: usize) -> Result<Self, CarveError> {
        Ok(PixelBuffer {
            width,
            height,
            stride,
            data: try_alloc(stride * height as usize)?,
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

    /// Bytes per row, padding included.
    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// The logical pixels of one row, padding excluded.
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.stride;
        &self.data[start..start + self.width as usize * BYTES_PER_PIXEL]
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let at = y as usize * self.stride + x as usize * BYTES_PER_PIXEL;
        [
            self.data[at],
            self.data[at + 1],
            self.data[at + 2],
            self.data[at + 3],
        ]
    }

    pub fn put_pixel(&mut self, x: u32, y: u32, pixel: [u8; 4]) {
        let at = y as usize * self.stride + x as usize * BYTES_PER_PIXEL;
        self.data[at..at + BYTES_PER_PIXEL].copy_from_slice(&pixel);
    }

    /// The same image with rows and columns exchanged.  The result is
    /// tightly packed regardless of the source stride.
    pub fn transposed(&self) -> Result<Self, CarveError> {
        let (width, height) = (self.height, self.width);
        let stride = width as usize * BYTES_PER_PIXEL;
        let mut out = Self::try_zeroed(width, height, stride)?;
        if stride > 0 {
            let (source, src_stride) = (&self.data, self.stride);
            parallel::for_each_row(&mut out.data, stride, |y, row| {
                for (x, px) in row.chunks_exact_mut(BYTES_PER_PIXEL).enumerate() {
                    let at = x * src_stride + y * BYTES_PER_PIXEL;
                    px.copy_from_slice(&source[at..at + BYTES_PER_PIXEL]);
                }
            });
        }
        Ok(out)
    }

    /// Copy the logical pixels out into an `image` buffer, dropping any
    /// row padding.
    pub fn to_rgba_image(&self) -> RgbaImage {
        let mut raw = Vec::with_capacity(self.width as usize * self.height as usize * 4);
        (0..self.height).for_each(|y| raw.extend_from_slice(self.row(y)));
        RgbaImage::from_raw(self.width, self.height, raw)
            .unwrap_or_else(|| RgbaImage::new(self.width, self.height))
    }
}

impl From<RgbaImage> for PixelBuffer {
    fn from(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        PixelBuffer {
            width,
            height,
            stride: width as usize * BYTES_PER_PIXEL,
            data: image.into_raw(),
        }
    }
}

impl TryFrom<&DynamicImage> for PixelBuffer {
    type Error = CarveError;

    /// Only genuine RGBA8 images are accepted; anything else has to be
    /// converted explicitly by the caller.
    fn try_from(image: &DynamicImage) -> Result<Self, CarveError> {
        match image {
            DynamicImage::ImageRgba8(rgba) => Ok(rgba.clone().into()),
            other => Err(CarveError::BufferFormat(format!(
                "{:?} image; expected {:?}",
                other.color(),
                ColorType::Rgba8
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // A 3x2 image with two bytes of padding per row, filled with
    // (x, y, 0, 255) and padding bytes of 0xEE.
    fn padded() -> PixelBuffer {
        let stride = 3 * 4 + 2;
        let mut data = vec![0xEE; stride * 2];
        for y in 0..2 {
            for x in 0..3 {
                let at = y * stride + x * 4;
                data[at..at + 4].copy_from_slice(&[x as u8, y as u8, 0, 255]);
            }
        }
        PixelBuffer::from_raw(3, 2, 4, stride, data).unwrap()
    }

    #[test]
    fn padding_is_respected() {
        let buf = padded();
        assert_eq!(buf.row(1), &[0, 1, 0, 255, 1, 1, 0, 255, 2, 1, 0, 255]);
        assert_eq!(buf.pixel(2, 1), [2, 1, 0, 255]);
        let image = buf.to_rgba_image();
        assert_eq!(image.dimensions(), (3, 2));
        assert_eq!(image.get_pixel(2, 1).0, [2, 1, 0, 255]);
    }

    #[test]
    fn non_rgba_layouts_are_refused() {
        assert!(matches!(
            PixelBuffer::from_raw(2, 2, 3, 6, vec![0; 12]),
            Err(CarveError::BufferFormat(_))
        ));
        assert!(matches!(
            PixelBuffer::from_raw(2, 2, 4, 7, vec![0; 14]),
            Err(CarveError::BufferFormat(_))
        ));
        assert!(matches!(
            PixelBuffer::from_raw(2, 2, 4, 8, vec![0; 15]),
            Err(CarveError::BufferFormat(_))
        ));
        let rgb = DynamicImage::new_rgb8(2, 2);
        assert!(PixelBuffer::try_from(&rgb).is_err());
    }

    #[test]
    fn transpose_reads_through_the_stride() {
        let flipped = padded().transposed().unwrap();
        assert_eq!(flipped.dimensions(), (2, 3));
        assert_eq!(flipped.stride(), 8);
        assert_eq!(flipped.pixel(1, 2), [2, 1, 0, 255]);
        assert_eq!(flipped.transposed().unwrap().to_rgba_image(), padded().to_rgba_image());
    }
}
