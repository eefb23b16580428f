//! Arrow direction classification
//!
//! Derives a cardinal direction from the small arrow glyph next to the
//! active hint, with plain contour geometry: Canny edges, the largest
//! external contour, its two extremities, and a neighbor-density test to
//! tell the pointed head from the broader tail. No learned model.

use image::GrayImage;
use imageproc::contours::{find_contours, BorderType, Contour};
use imageproc::edges::canny;
use imageproc::point::Point;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::hunt::Direction;

/// Tunables for the classifier. Defaults match the panel's arrow glyph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArrowSettings {
    /// Canny low threshold
    pub canny_low: f32,
    /// Canny high threshold
    pub canny_high: f32,
    /// Minimum distance between the two extremities, as a fraction of the
    /// farthest point's distance from the centroid. Keeps the second
    /// extremity from landing right next to the first.
    pub extremity_ratio: f64,
    /// Neighborhood radius for the head/tail test, as a fraction of the
    /// farthest point's distance from the centroid.
    pub neighbor_radius_ratio: f64,
}

impl Default for ArrowSettings {
    fn default() -> Self {
        Self {
            canny_low: 50.0,
            canny_high: 150.0,
            extremity_ratio: 0.7,
            neighbor_radius_ratio: 0.2,
        }
    }
}

pub struct ArrowClassifier {
    settings: ArrowSettings,
}

impl ArrowClassifier {
    pub fn new(settings: ArrowSettings) -> Self {
        Self { settings }
    }

    /// Classify the arrow in a cropped grayscale region.
    ///
    /// Every missing precondition (no contours, degenerate shape, no valid
    /// head/tail pair) returns `None`: direction undetermined for this
    /// cycle, caller aborts the cycle without crashing.
    pub fn classify(&self, region: &GrayImage) -> Option<Direction> {
        let edges = canny(region, self.settings.canny_low, self.settings.canny_high);

        let contour = match primary_contour(&edges) {
            Some(contour) => contour,
            None => {
                warn!("no contours found in arrow region");
                return None;
            }
        };

        self.direction_of_contour(&contour)
    }

    /// Direction of an arrow shape given as a closed contour point sequence.
    pub fn direction_of_contour(&self, points: &[Point<i32>]) -> Option<Direction> {
        let (cx, cy) = match centroid(points) {
            Some(c) => c,
            None => {
                warn!("arrow contour has zero area moment");
                return None;
            }
        };

        // Farthest point from the centroid: one extremity of the shape.
        let (head_candidate, max_dist) = points
            .iter()
            .map(|p| (p, dist((p.x as f64, p.y as f64), (cx, cy))))
            .max_by(|a, b| a.1.total_cmp(&b.1))?;
        if max_dist == 0.0 {
            return None;
        }

        // Second extremity: farthest from the centroid among points far
        // enough from the first to sit on the opposite end of the shape.
        let min_separation = max_dist * self.settings.extremity_ratio;
        let tail_candidate = points
            .iter()
            .filter(|p| dist_points(p, head_candidate) > min_separation)
            .map(|p| (p, dist((p.x as f64, p.y as f64), (cx, cy))))
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(p, _)| p)?;

        // The pointed tip has a narrower local contour than the broad tail:
        // fewer neighboring contour points around it.
        let radius = max_dist * self.settings.neighbor_radius_ratio;
        let mut head_neighbors = 0usize;
        let mut tail_neighbors = 0usize;
        for p in points {
            if dist_points(p, head_candidate) < radius {
                head_neighbors += 1;
            }
            if dist_points(p, tail_candidate) < radius {
                tail_neighbors += 1;
            }
        }

        let (head, tail) = if head_neighbors < tail_neighbors {
            (head_candidate, tail_candidate)
        } else {
            (tail_candidate, head_candidate)
        };

        let dx = (head.x - tail.x) as f64;
        let dy = (head.y - tail.y) as f64;
        let angle = dy.atan2(dx).to_degrees();
        let direction = Direction::from_angle(angle);
        debug!(
            "arrow tail ({},{}) -> head ({},{}), angle {angle:.1}, direction {direction}",
            tail.x, tail.y, head.x, head.y
        );
        Some(direction)
    }
}

/// The contour of maximum enclosed area among the external contours of the
/// edge map. Operating assumption: the arrow glyph is the dominant shape in
/// the crop. Isolated here so a smarter shape picker can replace it.
pub fn primary_contour(edges: &GrayImage) -> Option<Vec<Point<i32>>> {
    let contours: Vec<Contour<i32>> = find_contours(edges);

    contours
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer)
        .max_by(|a, b| {
            enclosed_area(&a.points).total_cmp(&enclosed_area(&b.points))
        })
        .map(|c| c.points)
}

/// Absolute shoelace area of a closed point sequence.
fn enclosed_area(points: &[Point<i32>]) -> f64 {
    (shoelace_sum(points) as f64 / 2.0).abs()
}

/// Twice the signed area, exact in integer arithmetic.
fn shoelace_sum(points: &[Point<i32>]) -> i64 {
    if points.len() < 3 {
        return 0;
    }
    let mut sum = 0i64;
    for (i, p) in points.iter().enumerate() {
        let q = &points[(i + 1) % points.len()];
        sum += p.x as i64 * q.y as i64 - q.x as i64 * p.y as i64;
    }
    sum
}

/// Area-moment centroid of a closed contour. `None` when the enclosed area
/// is zero (degenerate or collinear shape).
fn centroid(points: &[Point<i32>]) -> Option<(f64, f64)> {
    let double_area = shoelace_sum(points);
    if double_area == 0 {
        return None;
    }

    let mut cx = 0.0;
    let mut cy = 0.0;
    for (i, p) in points.iter().enumerate() {
        let q = &points[(i + 1) % points.len()];
        let cross = (p.x as i64 * q.y as i64 - q.x as i64 * p.y as i64) as f64;
        cx += (p.x + q.x) as f64 * cross;
        cy += (p.y + q.y) as f64 * cross;
    }
    let scale = 3.0 * double_area as f64;
    Some((cx / scale, cy / scale))
}

fn dist(a: (f64, f64), b: (f64, f64)) -> f64 {
    let dx = a.0 - b.0;
    let dy = a.1 - b.1;
    (dx * dx + dy * dy).sqrt()
}

fn dist_points(a: &Point<i32>, b: &Point<i32>) -> f64 {
    dist((a.x as f64, a.y as f64), (b.x as f64, b.y as f64))
}
