//! Detector stages, each a plain function over the previous stage's output:
//! contour → [`Candidate`] → near-duplicate suppression → rectified patch →
//! [`Code`] → identified [`Marker`] → id de-duplication.

use fiducial_core::{
    approx_polygon_closed, find_contours, is_convex, otsu_threshold, perimeter, threshold_binary,
    warp_quad_to_square, Contour, GrayImage, GrayImageView,
};
use nalgebra::Point2;

use super::MarkerDetectorParams;
use crate::{Code, Identification, Marker};

/// An unidentified quadrilateral that passed the geometric filters.
///
/// Corners run clockwise on screen (y down).
#[derive(Clone, Debug, PartialEq)]
pub struct Candidate {
    pub corners: [Point2<f32>; 4],
}

impl Candidate {
    /// Build a candidate, swapping corners 1 and 3 when the input winds the
    /// other way.
    pub fn new(mut corners: [Point2<f32>; 4]) -> Self {
        let d1 = corners[1] - corners[0];
        let d2 = corners[2] - corners[0];
        if d1.x * d2.y - d1.y * d2.x < 0.0 {
            corners.swap(1, 3);
        }
        Self { corners }
    }

    pub fn perimeter(&self) -> f32 {
        perimeter(&self.corners)
    }

    /// Mean distance between corresponding corners.
    pub fn mean_corner_distance(&self, other: &Candidate) -> f32 {
        self.corners
            .iter()
            .zip(&other.corners)
            .map(|(a, b)| (a - b).norm())
            .sum::<f32>()
            / 4.0
    }
}

/// Turn one traced border into a candidate, or reject it.
///
/// Rejected when the border has at most `min_points` points, when its
/// polygon approximation is not a convex quad, or when a side is not longer
/// than `params.min_corner_distance`.
pub fn quad_from_contour(contour: &Contour, min_points: usize, params: &MarkerDetectorParams) -> Option<Candidate> {
    if contour.points.len() <= min_points {
        return None;
    }
    let points: Vec<Point2<f64>> = contour
        .points
        .iter()
        .map(|p| Point2::new(p.x as f64, p.y as f64))
        .collect();
    let poly = approx_polygon_closed(&points, points.len() as f64 * params.approx_epsilon_frac);
    if poly.len() != 4 || !is_convex(&poly) {
        return None;
    }

    let corners: [Point2<f32>; 4] = std::array::from_fn(|i| Point2::new(poly[i].x as f32, poly[i].y as f32));
    let min_side = (0..4)
        .map(|i| (corners[(i + 1) % 4] - corners[i]).norm())
        .fold(f32::INFINITY, f32::min);
    if min_side <= params.min_corner_distance {
        return None;
    }
    Some(Candidate::new(corners))
}

/// Trace `binary` and keep every border that passes [`quad_from_contour`].
pub fn find_candidates(binary: &GrayImageView<'_>, params: &MarkerDetectorParams) -> Vec<Candidate> {
    let min_points = params.min_contour_points(binary.width);
    let contours = find_contours(binary.data, binary.width, binary.height);
    log::trace!("contours: {}, min points: {}", contours.len(), min_points);
    contours
        .iter()
        .filter_map(|c| quad_from_contour(c, min_points, params))
        .collect()
}

/// Of every pair closer than `min_distance` (mean corner distance), drop the
/// one with the smaller perimeter. On equal perimeters the later one goes.
pub fn suppress_near_duplicates(candidates: Vec<Candidate>, min_distance: f32) -> Vec<Candidate> {
    let n = candidates.len();
    let perimeters: Vec<f32> = candidates.iter().map(Candidate::perimeter).collect();
    let mut removed = vec![false; n];
    for i in 0..n {
        for j in i + 1..n {
            if candidates[i].mean_corner_distance(&candidates[j]) < min_distance {
                if perimeters[i] < perimeters[j] {
                    removed[i] = true;
                } else {
                    removed[j] = true;
                }
            }
        }
    }
    candidates
        .into_iter()
        .zip(removed)
        .filter_map(|(c, gone)| (!gone).then_some(c))
        .collect()
}

/// Perspective-rectify the candidate into a `size x size` patch; corner 0
/// lands top-left and the rest follow clockwise.
pub fn rectify(gray: &GrayImageView<'_>, candidate: &Candidate, size: usize) -> Option<GrayImage> {
    warp_quad_to_square(gray, &candidate.corners, size)
}

/// Binarize a canonical patch and read its 7x7 cells.
///
/// The patch is split with Otsu's threshold; a patch without contrast falls
/// back to `fallback_threshold`. Codes with a white border cell are rejected.
pub fn read_code(patch: &GrayImageView<'_>, fallback_threshold: u8) -> Option<Code> {
    let t = otsu_threshold(patch.data).unwrap_or(fallback_threshold);
    let mut binary = GrayImage::default();
    threshold_binary(patch, t, &mut binary);
    let code = Code::from_binary_patch(&binary.view())?;
    code.has_black_border().then_some(code)
}

/// Decode `code` read from `candidate` and rotate the corner list so that
/// corner 0 is the top-left of the upright pattern.
pub fn identify(candidate: &Candidate, code: &Code) -> Option<Marker> {
    let Identification { id, rotations } = code.identify()?;
    let mut corners = candidate.corners;
    corners.rotate_left(((4 - rotations) % 4) as usize);
    let mut marker = Marker::new(id, corners);
    marker.rotations = rotations;
    Some(marker)
}

/// Sort by id and keep, per id, the marker with the larger perimeter; the
/// first one seen wins a tie.
pub fn dedup_by_id(mut markers: Vec<Marker>) -> Vec<Marker> {
    markers.sort_by_key(|m| m.id);
    let mut out: Vec<Marker> = Vec::with_capacity(markers.len());
    for m in markers {
        match out.last_mut() {
            Some(last) if last.id == m.id => {
                if m.perimeter() > last.perimeter() {
                    *last = m;
                }
            }
            _ => out.push(m),
        }
    }
    out
}
