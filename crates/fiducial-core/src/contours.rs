//! Border following on binary masks (Suzuki & Abe, 1985).
//!
//! All borders are reported, outer borders of foreground components as well
//! as hole borders, together with the index of their enclosing border. Pixels
//! outside the image are treated as background.

use nalgebra::Point2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BorderKind {
    Outer,
    Hole,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Contour {
    /// Border pixels in tracing order, `(x, y)`.
    pub points: Vec<Point2<i32>>,
    pub kind: BorderKind,
    /// Index of the enclosing contour in the returned list.
    pub parent: Option<usize>,
}

// (dx, dy) with y pointing down; increasing index turns counter-clockwise on screen.
const NEIGHBORS: [(isize, isize); 8] = [
    (1, 0),   // E
    (1, -1),  // NE
    (0, -1),  // N
    (-1, -1), // NW
    (-1, 0),  // W
    (-1, 1),  // SW
    (0, 1),   // S
    (1, 1),   // SE
];

struct LabelGrid {
    stride: usize,
    labels: Vec<i32>,
    offsets: [isize; 8],
}

impl LabelGrid {
    /// Copy the mask into a label buffer with a one-pixel background frame.
    fn from_mask(mask: &[u8], width: usize, height: usize) -> Self {
        let stride = width + 2;
        let mut labels = vec![0i32; stride * (height + 2)];
        for y in 0..height {
            for x in 0..width {
                if mask[y * width + x] != 0 {
                    labels[(y + 1) * stride + x + 1] = 1;
                }
            }
        }
        let offsets = NEIGHBORS.map(|(dx, dy)| dy * stride as isize + dx);
        Self {
            stride,
            labels,
            offsets,
        }
    }

    #[inline]
    fn neighbor(&self, idx: usize, dir: usize) -> usize {
        (idx as isize + self.offsets[dir]) as usize
    }

    #[inline]
    fn point(&self, idx: usize) -> Point2<i32> {
        Point2::new(
            (idx % self.stride) as i32 - 1,
            (idx / self.stride) as i32 - 1,
        )
    }

    /// Follow one border starting at `start`; `from_dir` points at the
    /// background pixel that triggered the border.
    fn follow(&mut self, start: usize, from_dir: usize, nbd: i32) -> Vec<Point2<i32>> {
        let first = (0..8)
            .map(|k| (from_dir + 8 - k) % 8)
            .find(|&d| self.labels[self.neighbor(start, d)] != 0);

        let Some(first_dir) = first else {
            // isolated pixel
            self.labels[start] = -nbd;
            return vec![self.point(start)];
        };

        let second = self.neighbor(start, first_dir);
        let mut points = Vec::new();
        let mut cur = start;
        let mut back_dir = first_dir;

        loop {
            points.push(self.point(cur));

            let mut east_is_background = false;
            let mut next_dir = back_dir;
            for k in 1..=8 {
                let d = (back_dir + k) % 8;
                if self.labels[self.neighbor(cur, d)] != 0 {
                    next_dir = d;
                    break;
                }
                if d == 0 {
                    east_is_background = true;
                }
            }

            if east_is_background {
                self.labels[cur] = -nbd;
            } else if self.labels[cur] == 1 {
                self.labels[cur] = nbd;
            }

            let next = self.neighbor(cur, next_dir);
            if next == start && cur == second {
                break;
            }
            back_dir = (next_dir + 4) % 8;
            cur = next;
        }

        points
    }
}

/// Trace every border of the foreground (non-zero) pixels of `mask`.
pub fn find_contours(mask: &[u8], width: usize, height: usize) -> Vec<Contour> {
    if width == 0 || height == 0 || mask.len() < width * height {
        return Vec::new();
    }

    let mut grid = LabelGrid::from_mask(mask, width, height);
    let stride = grid.stride;
    let mut contours: Vec<Contour> = Vec::new();
    // Border kind and contour index per border label; label 1 is the image frame.
    let mut borders: Vec<(BorderKind, Option<usize>)> =
        vec![(BorderKind::Hole, None), (BorderKind::Hole, None)];
    let mut nbd: i32 = 1;

    for y in 1..=height {
        let mut lnbd: i32 = 1;
        for x in 1..=width {
            let idx = y * stride + x;
            let v = grid.labels[idx];
            if v == 0 {
                continue;
            }

            let start = if v == 1 && grid.labels[idx - 1] == 0 {
                Some((BorderKind::Outer, 4))
            } else if v >= 1 && grid.labels[idx + 1] == 0 {
                if v > 1 {
                    lnbd = v;
                }
                Some((BorderKind::Hole, 0))
            } else {
                None
            };

            if let Some((kind, from_dir)) = start {
                nbd += 1;
                let (prev_kind, prev_contour) = borders[lnbd as usize];
                let parent = if kind == prev_kind {
                    prev_contour.and_then(|c| contours[c].parent)
                } else {
                    prev_contour
                };
                let points = grid.follow(idx, from_dir, nbd);
                contours.push(Contour {
                    points,
                    kind,
                    parent,
                });
                borders.push((kind, Some(contours.len() - 1)));
            }

            let v = grid.labels[idx];
            if v != 1 {
                lnbd = v.abs();
            }
        }
    }

    contours
}
