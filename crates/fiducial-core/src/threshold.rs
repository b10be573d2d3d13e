//! Binarization of greyscale frames into marker-ink foreground masks.
//!
//! Every method writes `255` for foreground (dark ink or edge) and `0` for
//! background, so contour tracing can run on the result directly.

use serde::{Deserialize, Serialize};

use crate::edges::canny;
use crate::{GrayImage, GrayImageView};

/// How to turn the greyscale frame into a binary mask.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum ThresholdMethod {
    /// Global inverted threshold: `v <= threshold` is foreground.
    Fixed { threshold: u8 },
    /// Inverted local-mean threshold: `v <= mean(block) - offset` is foreground.
    AdaptiveMean { block_size: usize, offset: f32 },
    /// Canny edge map with hysteresis thresholds on the L1 gradient magnitude.
    Canny { low: f32, high: f32 },
}

impl Default for ThresholdMethod {
    fn default() -> Self {
        Self::AdaptiveMean {
            block_size: 7,
            offset: 7.0,
        }
    }
}

impl ThresholdMethod {
    pub fn canny() -> Self {
        Self::Canny {
            low: 10.0,
            high: 220.0,
        }
    }
}

/// Binarize `src` into `out`, reusing the output allocation.
pub fn binarize(src: &GrayImageView<'_>, method: ThresholdMethod, out: &mut GrayImage) {
    match method {
        ThresholdMethod::Fixed { threshold } => threshold_inv(src, threshold, out),
        ThresholdMethod::AdaptiveMean { block_size, offset } => {
            adaptive_mean_inv(src, block_size, offset, out)
        }
        ThresholdMethod::Canny { low, high } => canny(src, low, high, out),
    }
}

fn reset(out: &mut GrayImage, width: usize, height: usize) {
    out.width = width;
    out.height = height;
    out.data.clear();
    out.data.resize(width * height, 0);
}

pub fn threshold_inv(src: &GrayImageView<'_>, threshold: u8, out: &mut GrayImage) {
    reset(out, src.width, src.height);
    for (dst, &v) in out.data.iter_mut().zip(src.data) {
        *dst = if v <= threshold { 255 } else { 0 };
    }
}

/// `v > threshold` becomes 255; used on rectified patches where white cells are the signal.
pub fn threshold_binary(src: &GrayImageView<'_>, threshold: u8, out: &mut GrayImage) {
    reset(out, src.width, src.height);
    for (dst, &v) in out.data.iter_mut().zip(src.data) {
        *dst = if v > threshold { 255 } else { 0 };
    }
}

/// Summed-area table of size `(w+1) x (h+1)`.
fn integral_image(src: &GrayImageView<'_>) -> Vec<u64> {
    let stride = src.width + 1;
    let mut sat = vec![0u64; stride * (src.height + 1)];
    for y in 0..src.height {
        let mut row_sum = 0u64;
        for x in 0..src.width {
            row_sum += src.data[y * src.width + x] as u64;
            sat[(y + 1) * stride + x + 1] = sat[y * stride + x + 1] + row_sum;
        }
    }
    sat
}

/// Local-mean inverted threshold. The window is clamped at the image border.
pub fn adaptive_mean_inv(src: &GrayImageView<'_>, block_size: usize, offset: f32, out: &mut GrayImage) {
    reset(out, src.width, src.height);
    if src.width == 0 || src.height == 0 {
        return;
    }
    let radius = (block_size.max(3) | 1) / 2;
    let sat = integral_image(src);
    let stride = src.width + 1;

    for y in 0..src.height {
        let y0 = y.saturating_sub(radius);
        let y1 = (y + radius + 1).min(src.height);
        for x in 0..src.width {
            let x0 = x.saturating_sub(radius);
            let x1 = (x + radius + 1).min(src.width);
            let sum = sat[y1 * stride + x1] + sat[y0 * stride + x0]
                - sat[y0 * stride + x1]
                - sat[y1 * stride + x0];
            let area = ((y1 - y0) * (x1 - x0)) as f32;
            let mean = sum as f32 / area;
            let v = src.data[y * src.width + x] as f32;
            if v <= mean - offset {
                out.data[y * src.width + x] = 255;
            }
        }
    }
}

/// Otsu threshold over `samples`. `None` when the samples carry no contrast.
pub fn otsu_threshold(samples: &[u8]) -> Option<u8> {
    let (min_v, max_v) = samples
        .iter()
        .fold((u8::MAX, u8::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if samples.is_empty() || min_v == max_v {
        return None;
    }

    let mut hist = [0u32; 256];
    for &v in samples {
        hist[v as usize] += 1;
    }
    if hist.iter().filter(|&&h| h > 0).count() <= 2 {
        return Some(((min_v as u16 + max_v as u16) / 2) as u8);
    }

    let total = samples.len() as f64;
    let sum_total: f64 = hist
        .iter()
        .enumerate()
        .map(|(i, &h)| i as f64 * h as f64)
        .sum();

    let mut sum_b = 0f64;
    let mut w_b = 0f64;
    let mut best_var = -1f64;
    let mut best_t = min_v;

    for (t, &h) in hist.iter().enumerate() {
        w_b += h as f64;
        if w_b < 1.0 {
            continue;
        }
        let w_f = total - w_b;
        if w_f < 1.0 {
            break;
        }

        sum_b += t as f64 * h as f64;
        let m_b = sum_b / w_b;
        let m_f = (sum_total - sum_b) / w_f;
        let var_between = w_b * w_f * (m_b - m_f) * (m_b - m_f);
        if var_between > best_var {
            best_var = var_between;
            best_t = t as u8;
        }
    }

    Some(best_t)
}
