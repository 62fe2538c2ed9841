//! Sun detection in a photograph.
//!
//! # Algorithm
//!
//! 1. Brightness plane: per-pixel maximum over the colour channels, so a
//!    saturated highlight in any one channel counts as bright.
//! 2. Adaptive threshold: the 99.9th percentile brightness (nearest rank),
//!    never below a fixed floor.
//! 3. Connected components over the binary mask (4-connectivity, union-find).
//! 4. The component with the highest area x mean intensity wins; larger area
//!    breaks ties, then scan order.
//! 5. Intensity-weighted centroid of the winner for sub-pixel position.
//!
//! The input is never modified and nothing is random, so repeated calls on
//! the same buffer give the same answer.

use image::DynamicImage;
use log::debug;
use ndarray::{Array2, ArrayView2};

use crate::error::{AnalemmaError, Result};
use crate::types::DetectedBlob;

pub const DEFAULT_PERCENTILE: f64 = 99.9;
pub const DEFAULT_MIN_AREA: usize = 4;
pub const DEFAULT_MIN_BRIGHTNESS: f64 = 0.5;

/// Single-channel brightness in [0, 1], indexed `[row, col]`.
pub fn brightness_plane(image: &DynamicImage) -> Array2<f64> {
    let rgb = image.to_rgb32f();
    let (width, height) = rgb.dimensions();
    Array2::from_shape_fn((height as usize, width as usize), |(row, col)| {
        let px = rgb.get_pixel(col as u32, row as u32);
        px.0.iter().fold(0.0_f64, |acc, &c| acc.max(c as f64))
    })
}

/// Nearest-rank percentile of all pixel values. `None` for an empty plane.
pub fn percentile(plane: &ArrayView2<f64>, pct: f64) -> Option<f64> {
    let mut values: Vec<f64> = plane.iter().copied().collect();
    if values.is_empty() {
        return None;
    }
    let rank = ((pct / 100.0) * values.len() as f64).ceil() as usize;
    let idx = rank.clamp(1, values.len()) - 1;
    let (_, value, _) = values.select_nth_unstable_by(idx, |a, b| a.total_cmp(b));
    Some(*value)
}

pub fn apply_threshold(plane: &ArrayView2<f64>, threshold: f64) -> Array2<bool> {
    plane.mapv(|v| v >= threshold)
}

fn find_root(parents: &mut [usize], label: usize) -> usize {
    let mut current = label;
    while current != parents[current] {
        parents[current] = parents[parents[current]];
        current = parents[current];
    }
    current
}

fn union_labels(parents: &mut [usize], a: usize, b: usize) {
    let root_a = find_root(parents, a);
    let root_b = find_root(parents, b);
    if root_a < root_b {
        parents[root_b] = root_a;
    } else if root_b < root_a {
        parents[root_a] = root_b;
    }
}

/// Two-pass 4-connected labelling. Background is 0; components are numbered
/// 1..=count in raster order of their first pixel.
pub fn connected_components(mask: &ArrayView2<bool>) -> (Array2<usize>, usize) {
    let (height, width) = mask.dim();
    let mut labels = Array2::zeros((height, width));
    let mut parents = vec![0usize];

    for row in 0..height {
        for col in 0..width {
            if !mask[[row, col]] {
                continue;
            }
            let up = if row > 0 { labels[[row - 1, col]] } else { 0 };
            let left = if col > 0 { labels[[row, col - 1]] } else { 0 };
            labels[[row, col]] = match (up, left) {
                (0, 0) => {
                    let next = parents.len();
                    parents.push(next);
                    next
                }
                (l, 0) | (0, l) => l,
                (u, l) => {
                    union_labels(&mut parents, u, l);
                    u.min(l)
                }
            };
        }
    }

    let mut relabel = vec![0usize; parents.len()];
    let mut count = 0;
    for label in 1..parents.len() {
        let root = find_root(&mut parents, label);
        if relabel[root] == 0 {
            count += 1;
            relabel[root] = count;
        }
        relabel[label] = relabel[root];
    }
    labels.mapv_inplace(|l| relabel[l]);
    (labels, count)
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Component {
    area: usize,
    sum: f64,
    sum_x: f64,
    sum_y: f64,
    sum_col: f64,
    sum_row: f64,
}

impl Component {
    fn mean_intensity(&self) -> f64 {
        self.sum / self.area as f64
    }

    fn score(&self) -> f64 {
        self.area as f64 * self.mean_intensity()
    }

    fn centroid(&self) -> (f64, f64) {
        if self.sum > 0.0 {
            (self.sum_x / self.sum, self.sum_y / self.sum)
        } else {
            (self.sum_col / self.area as f64, self.sum_row / self.area as f64)
        }
    }
}

fn measure_components(plane: &ArrayView2<f64>, labels: &ArrayView2<usize>, count: usize) -> Vec<Component> {
    let mut components = vec![Component::default(); count + 1];
    for ((row, col), &label) in labels.indexed_iter() {
        if label == 0 {
            continue;
        }
        let value = plane[[row, col]];
        let c = &mut components[label];
        c.area += 1;
        c.sum += value;
        c.sum_x += col as f64 * value;
        c.sum_y += row as f64 * value;
        c.sum_col += col as f64;
        c.sum_row += row as f64;
    }
    components.remove(0);
    components
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SunDetector {
    pub percentile: f64,
    pub min_area: usize,
    pub min_brightness: f64,
}

impl Default for SunDetector {
    fn default() -> Self {
        Self {
            percentile: DEFAULT_PERCENTILE,
            min_area: DEFAULT_MIN_AREA,
            min_brightness: DEFAULT_MIN_BRIGHTNESS,
        }
    }
}

impl SunDetector {
    pub fn new(percentile: f64, min_area: usize, min_brightness: f64) -> Result<Self> {
        if !(percentile > 0.0 && percentile <= 100.0) {
            return Err(AnalemmaError::configuration(format!(
                "percentile {percentile} outside (0, 100]"
            )));
        }
        if min_area == 0 {
            return Err(AnalemmaError::configuration("minimum blob area must be at least 1 px"));
        }
        if !(min_brightness.is_finite() && min_brightness > 0.0) {
            return Err(AnalemmaError::configuration(format!(
                "minimum brightness must be positive, got {min_brightness}"
            )));
        }
        Ok(Self {
            percentile,
            min_area,
            min_brightness,
        })
    }

    pub fn detect_image(&self, image: &DynamicImage) -> Result<DetectedBlob> {
        self.detect(&brightness_plane(image).view())
    }

    pub fn detect(&self, plane: &ArrayView2<f64>) -> Result<DetectedBlob> {
        let not_found = |threshold| AnalemmaError::NoBrightSourceFound {
            threshold,
            min_area: self.min_area,
        };
        let threshold = percentile(plane, self.percentile)
            .ok_or_else(|| not_found(self.min_brightness))?
            .max(self.min_brightness);

        let mask = apply_threshold(plane, threshold);
        let (labels, count) = connected_components(&mask.view());
        let components = measure_components(plane, &labels.view(), count);
        debug!(
            "threshold {threshold:.4}: {count} components over {} px",
            components.iter().map(|c| c.area).sum::<usize>()
        );

        let best = components
            .iter()
            .filter(|c| c.area >= self.min_area)
            .fold(None::<&Component>, |best, c| match best {
                Some(b) if c.score() > b.score() || (c.score() == b.score() && c.area > b.area) => Some(c),
                Some(b) => Some(b),
                None => Some(c),
            })
            .ok_or_else(|| not_found(threshold))?;

        let (centroid_x, centroid_y) = best.centroid();
        debug!("sun at ({centroid_x:.2}, {centroid_y:.2}), {} px", best.area);
        Ok(DetectedBlob {
            centroid_x,
            centroid_y,
            pixel_area: best.area,
            mean_intensity: best.mean_intensity(),
            threshold,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn mask_from(pattern: &[&[u8]]) -> Array2<bool> {
        Array2::from_shape_fn((pattern.len(), pattern[0].len()), |(r, c)| pattern[r][c] != 0)
    }

    #[test]
    fn test_components_u_shape_merges() {
        #[rustfmt::skip]
        let mask = mask_from(&[
            &[1, 0, 1],
            &[1, 0, 1],
            &[1, 1, 1],
        ]);
        let (labels, count) = connected_components(&mask.view());
        assert_eq!(count, 1);
        assert!(labels.iter().all(|&l| l <= 1));
        assert_eq!(labels[[0, 2]], 1);
    }

    #[test]
    fn test_components_diagonal_not_connected() {
        let mask = mask_from(&[&[1, 0], &[0, 1]]);
        let (labels, count) = connected_components(&mask.view());
        assert_eq!(count, 2);
        assert_eq!(labels[[0, 0]], 1);
        assert_eq!(labels[[1, 1]], 2);
    }

    #[test]
    fn test_components_empty() {
        let mask = Array2::from_elem((4, 4), false);
        let (labels, count) = connected_components(&mask.view());
        assert_eq!(count, 0);
        assert!(labels.iter().all(|&l| l == 0));
    }

    #[test]
    fn test_percentile_nearest_rank() {
        let plane = Array2::from_shape_vec((1, 10), (1..=10).map(f64::from).collect()).unwrap();
        assert_relative_eq!(percentile(&plane.view(), 50.0).unwrap(), 5.0);
        assert_relative_eq!(percentile(&plane.view(), 99.9).unwrap(), 10.0);
        assert_relative_eq!(percentile(&plane.view(), 100.0).unwrap(), 10.0);
        assert!(percentile(&Array2::<f64>::zeros((0, 0)).view(), 50.0).is_none());
    }

    #[test]
    fn test_weighted_centroid_pulls_toward_brighter_pixel() {
        let c = Component {
            area: 2,
            sum: 4.0,
            sum_x: 0.0 * 1.0 + 1.0 * 3.0,
            sum_y: 0.0,
            sum_col: 1.0,
            sum_row: 0.0,
        };
        let (x, y) = c.centroid();
        assert_relative_eq!(x, 0.75);
        assert_relative_eq!(y, 0.0);
    }
}
