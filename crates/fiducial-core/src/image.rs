use thiserror::Error;

/// Borrowed single-channel 8-bit image, row-major.
#[derive(Clone, Copy, Debug)]
pub struct GrayImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [u8], // row-major, len = w*h
}

/// Owned single-channel 8-bit image, row-major.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GrayImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

/// Borrowed interleaved 8-bit image with 1, 3 (RGB) or 4 (RGBA) channels.
#[derive(Clone, Copy, Debug)]
pub struct ImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub channels: usize,
    pub data: &'a [u8],
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ImageError {
    #[error("unsupported channel count {0} (expected 1, 3 or 4)")]
    UnsupportedChannels(usize),
    #[error("buffer length {got} does not match {width}x{height}x{channels}")]
    BufferSize {
        width: usize,
        height: usize,
        channels: usize,
        got: usize,
    },
}

impl GrayImage {
    pub fn new(width: usize, height: usize) -> Self {
        Self::filled(width, height, 0)
    }

    pub fn filled(width: usize, height: usize, value: u8) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    pub fn view(&self) -> GrayImageView<'_> {
        GrayImageView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: u8) {
        self.data[y * self.width + x] = value;
    }

    /// Fill the axis-aligned rectangle `[x0, x0+w) x [y0, y0+h)`, clipped to the image.
    pub fn fill_rect(&mut self, x0: usize, y0: usize, w: usize, h: usize, value: u8) {
        let x1 = (x0 + w).min(self.width);
        let y1 = (y0 + h).min(self.height);
        for y in y0.min(y1)..y1 {
            let row = y * self.width;
            self.data[row + x0.min(x1)..row + x1].fill(value);
        }
    }

    /// Copy `src` into this image with its top-left corner at `(x0, y0)`, clipped.
    pub fn blit(&mut self, src: &GrayImageView<'_>, x0: usize, y0: usize) {
        if x0 >= self.width || y0 >= self.height {
            return;
        }
        let w = src.width.min(self.width - x0);
        let h = src.height.min(self.height - y0);
        for y in 0..h {
            let dst_row = (y0 + y) * self.width + x0;
            let src_row = y * src.width;
            self.data[dst_row..dst_row + w].copy_from_slice(&src.data[src_row..src_row + w]);
        }
    }

    pub fn count_non_zero(&self) -> usize {
        self.view().count_non_zero()
    }
}

impl<'a> GrayImageView<'a> {
    /// Check that `data` holds exactly `width * height` pixels.
    pub fn validate(&self) -> Result<(), ImageError> {
        if self.data.len() != self.width * self.height {
            return Err(ImageError::BufferSize {
                width: self.width,
                height: self.height,
                channels: 1,
                got: self.data.len(),
            });
        }
        Ok(())
    }

    pub fn count_non_zero(&self) -> usize {
        self.data.iter().filter(|&&v| v != 0).count()
    }

    /// Number of non-zero pixels inside `[x0, x0+w) x [y0, y0+h)`, clipped.
    pub fn count_non_zero_in(&self, x0: usize, y0: usize, w: usize, h: usize) -> usize {
        let x1 = (x0 + w).min(self.width);
        let y1 = (y0 + h).min(self.height);
        let mut n = 0;
        for y in y0.min(y1)..y1 {
            let row = &self.data[y * self.width..(y + 1) * self.width];
            n += row[x0.min(x1)..x1].iter().filter(|&&v| v != 0).count();
        }
        n
    }
}

impl<'a> ImageView<'a> {
    pub fn gray(view: GrayImageView<'a>) -> Self {
        Self {
            width: view.width,
            height: view.height,
            channels: 1,
            data: view.data,
        }
    }

    fn validate(&self) -> Result<(), ImageError> {
        if !matches!(self.channels, 1 | 3 | 4) {
            return Err(ImageError::UnsupportedChannels(self.channels));
        }
        if self.data.len() != self.width * self.height * self.channels {
            return Err(ImageError::BufferSize {
                width: self.width,
                height: self.height,
                channels: self.channels,
                got: self.data.len(),
            });
        }
        Ok(())
    }

    /// Convert into `out`, reusing its allocation. Colour input uses BT.601 luma weights.
    pub fn to_gray_into(&self, out: &mut GrayImage) -> Result<(), ImageError> {
        self.validate()?;
        out.width = self.width;
        out.height = self.height;
        out.data.clear();

        if self.channels == 1 {
            out.data.extend_from_slice(self.data);
            return Ok(());
        }

        out.data.reserve(self.width * self.height);
        for px in self.data.chunks_exact(self.channels) {
            let y = 0.299 * px[0] as f32 + 0.587 * px[1] as f32 + 0.114 * px[2] as f32;
            out.data.push(y.round().clamp(0.0, 255.0) as u8);
        }
        Ok(())
    }

    pub fn to_gray(&self) -> Result<GrayImage, ImageError> {
        let mut out = GrayImage::new(0, 0);
        self.to_gray_into(&mut out)?;
        Ok(out)
    }
}

#[inline]
fn get_gray(src: &GrayImageView<'_>, x: i32, y: i32) -> u8 {
    if x < 0 || y < 0 || x >= src.width as i32 || y >= src.height as i32 {
        return 0;
    }
    src.data[y as usize * src.width + x as usize]
}

/// Bilinear sample; pixels outside the image read as black.
#[inline]
pub fn sample_bilinear(src: &GrayImageView<'_>, x: f32, y: f32) -> f32 {
    let x0 = x.floor() as i32;
    let y0 = y.floor() as i32;
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let p00 = get_gray(src, x0, y0) as f32;
    let p10 = get_gray(src, x0 + 1, y0) as f32;
    let p01 = get_gray(src, x0, y0 + 1) as f32;
    let p11 = get_gray(src, x0 + 1, y0 + 1) as f32;

    let a = p00 + fx * (p10 - p00);
    let b = p01 + fx * (p11 - p01);
    a + fy * (b - a)
}

#[inline]
pub fn sample_bilinear_u8(src: &GrayImageView<'_>, x: f32, y: f32) -> u8 {
    sample_bilinear(src, x, y).round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgba_converts_with_luma_weights() {
        let data = [255u8, 0, 0, 255, 0, 255, 0, 255, 0, 0, 255, 0, 10, 10, 10, 7];
        let view = ImageView {
            width: 4,
            height: 1,
            channels: 4,
            data: &data,
        };
        let gray = view.to_gray().expect("valid rgba buffer");
        assert_eq!(gray.data, vec![76, 150, 29, 10]);
    }

    #[test]
    fn rejects_bad_buffers() {
        let data = [0u8; 5];
        let two = ImageView {
            width: 1,
            height: 1,
            channels: 2,
            data: &data[..2],
        };
        assert_eq!(two.to_gray(), Err(ImageError::UnsupportedChannels(2)));

        let short = ImageView {
            width: 2,
            height: 1,
            channels: 3,
            data: &data,
        };
        assert!(matches!(short.to_gray(), Err(ImageError::BufferSize { got: 5, .. })));
    }

    #[test]
    fn blit_and_count_respect_bounds() {
        let mut canvas = GrayImage::filled(6, 4, 0);
        let patch = GrayImage::filled(3, 3, 255);
        canvas.blit(&patch.view(), 4, 2);
        assert_eq!(canvas.count_non_zero(), 4);
        assert_eq!(canvas.view().count_non_zero_in(4, 2, 10, 10), 4);
        assert_eq!(canvas.view().count_non_zero_in(0, 0, 4, 4), 0);
    }

    #[test]
    fn bilinear_interpolates_between_pixels() {
        let img = GrayImage {
            width: 2,
            height: 1,
            data: vec![0, 200],
        };
        assert_eq!(sample_bilinear_u8(&img.view(), 0.5, 0.0), 100);
        assert_eq!(sample_bilinear_u8(&img.view(), 1.0, 0.0), 200);
    }
}
