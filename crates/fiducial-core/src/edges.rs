//! Canny edge map: Sobel gradients, non-maximum suppression, hysteresis.

use crate::{GrayImage, GrayImageView};

struct Gradients {
    width: usize,
    height: usize,
    gx: Vec<f32>,
    gy: Vec<f32>,
    mag: Vec<f32>,
}

#[inline]
fn px(src: &GrayImageView<'_>, x: isize, y: isize) -> f32 {
    let xc = x.clamp(0, src.width as isize - 1) as usize;
    let yc = y.clamp(0, src.height as isize - 1) as usize;
    src.data[yc * src.width + xc] as f32
}

fn sobel(src: &GrayImageView<'_>) -> Gradients {
    let (w, h) = (src.width, src.height);
    let mut gx = vec![0f32; w * h];
    let mut gy = vec![0f32; w * h];
    let mut mag = vec![0f32; w * h];

    for y in 0..h as isize {
        for x in 0..w as isize {
            let p = |dx: isize, dy: isize| px(src, x + dx, y + dy);
            let sx = (p(1, -1) + 2.0 * p(1, 0) + p(1, 1)) - (p(-1, -1) + 2.0 * p(-1, 0) + p(-1, 1));
            let sy = (p(-1, 1) + 2.0 * p(0, 1) + p(1, 1)) - (p(-1, -1) + 2.0 * p(0, -1) + p(1, -1));
            let i = y as usize * w + x as usize;
            gx[i] = sx;
            gy[i] = sy;
            mag[i] = sx.abs() + sy.abs();
        }
    }

    Gradients {
        width: w,
        height: h,
        gx,
        gy,
        mag,
    }
}

const TAN_22_5: f32 = 0.414_213_57;
const TAN_67_5: f32 = 2.414_213_6;

/// Keep gradient maxima along the quantized gradient direction.
fn suppress_non_maxima(g: &Gradients) -> Vec<f32> {
    let (w, h) = (g.width, g.height);
    let mut out = vec![0f32; w * h];
    let at = |x: isize, y: isize| -> f32 {
        if x < 0 || y < 0 || x >= w as isize || y >= h as isize {
            0.0
        } else {
            g.mag[y as usize * w + x as usize]
        }
    };

    for y in 0..h as isize {
        for x in 0..w as isize {
            let i = y as usize * w + x as usize;
            let m = g.mag[i];
            if m <= 0.0 {
                continue;
            }
            let ax = g.gx[i].abs();
            let ay = g.gy[i].abs();
            let (a, b) = if ay <= ax * TAN_22_5 {
                (at(x - 1, y), at(x + 1, y))
            } else if ay >= ax * TAN_67_5 {
                (at(x, y - 1), at(x, y + 1))
            } else if (g.gx[i] > 0.0) == (g.gy[i] > 0.0) {
                (at(x - 1, y - 1), at(x + 1, y + 1))
            } else {
                (at(x + 1, y - 1), at(x - 1, y + 1))
            };
            if m > a && m >= b {
                out[i] = m;
            }
        }
    }
    out
}

/// Canny edge detector; edges are written as 255.
pub fn canny(src: &GrayImageView<'_>, low: f32, high: f32, out: &mut GrayImage) {
    let (w, h) = (src.width, src.height);
    out.width = w;
    out.height = h;
    out.data.clear();
    out.data.resize(w * h, 0);
    if w == 0 || h == 0 {
        return;
    }

    let (low, high) = if low > high { (high, low) } else { (low, high) };
    let nms = suppress_non_maxima(&sobel(src));

    let mut stack: Vec<usize> = Vec::new();
    for (i, &m) in nms.iter().enumerate() {
        if m > high {
            out.data[i] = 255;
            stack.push(i);
        }
    }

    while let Some(i) = stack.pop() {
        let x = (i % w) as isize;
        let y = (i / w) as isize;
        for dy in -1..=1isize {
            for dx in -1..=1isize {
                let nx = x + dx;
                let ny = y + dy;
                if nx < 0 || ny < 0 || nx >= w as isize || ny >= h as isize {
                    continue;
                }
                let j = ny as usize * w + nx as usize;
                if out.data[j] == 0 && nms[j] > low {
                    out.data[j] = 255;
                    stack.push(j);
                }
            }
        }
    }
}
