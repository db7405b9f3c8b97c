//! Square-window traversal shared by the spatial filters.
//!
//! Filters disagree on what happens at the image border, and callers
//! depend on the exact behavior of each one, so the border handling is
//! an explicit [`BorderPolicy`] rather than a single convention:
//!
//! - [`BorderPolicy::SkipMissingNeighbors`] visits every pixel. Window
//!   offsets that fall outside the image are dropped, so border pixels
//!   see a smaller sample (no padding, no replication).
//! - [`BorderPolicy::LeaveUnprocessed`] visits only pixels at least
//!   `width` away from every edge. The border band is copied from the
//!   source unchanged.

use crate::matrix::Pixel;
use crate::types::PixelMatrix;

/// How a neighborhood filter treats pixels near the image edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorderPolicy {
    /// Process every pixel using only the in-bounds part of its window.
    SkipMissingNeighbors,
    /// Copy a band of this many pixels from the source untouched.
    LeaveUnprocessed(u32),
}

/// One in-bounds pixel of a window, with its offset from the center.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    /// Column offset from the center pixel.
    pub dx: i32,
    /// Row offset from the center pixel.
    pub dy: i32,
    /// The pixel value.
    pub pixel: Pixel,
}

/// The window around one target pixel.
#[derive(Debug)]
pub struct Neighborhood<'a> {
    /// The target pixel itself.
    pub center: Pixel,
    /// Every in-bounds pixel of the window, center included, in row-major
    /// order.
    pub samples: &'a [Sample],
}

impl Neighborhood<'_> {
    /// Values of one channel across the window.
    pub fn channel(&self, c: usize) -> impl Iterator<Item = u8> + '_ {
        self.samples.iter().map(move |s| s.pixel.0[c])
    }

    /// Samples excluding the center pixel.
    pub fn neighbors(&self) -> impl Iterator<Item = &Sample> + '_ {
        self.samples.iter().filter(|s| s.dx != 0 || s.dy != 0)
    }

    /// Integer correlation of one channel with an `N×N` kernel centered
    /// on the target pixel. Missing samples contribute nothing.
    #[must_use]
    pub fn weighted_sum<const N: usize>(&self, kernel: &[[i32; N]; N], c: usize) -> i32 {
        let half = i64::try_from(N / 2).unwrap_or(0);
        self.samples
            .iter()
            .filter_map(|s| {
                let row = usize::try_from(i64::from(s.dy) + half).ok()?;
                let col = usize::try_from(i64::from(s.dx) + half).ok()?;
                let weight = kernel.get(row)?.get(col)?;
                Some(weight * i32::from(s.pixel.0[c]))
            })
            .sum()
    }
}

/// Signed distance from `from` to `to`.
fn offset(from: u32, to: u32) -> i32 {
    i32::try_from(i64::from(to) - i64::from(from)).unwrap_or(i32::MAX)
}

/// Build a new matrix by replacing each processed pixel with
/// `f(neighborhood)`.
///
/// `radius` is the half-width of the square window (1 for 3×3, 2 for
/// 5×5). Pixels the policy leaves alone are copied from `image`.
pub fn map_neighborhoods<F>(
    image: &PixelMatrix,
    radius: u32,
    policy: BorderPolicy,
    mut f: F,
) -> PixelMatrix
where
    F: FnMut(&Neighborhood<'_>) -> Pixel,
{
    let (width, height) = image.dimensions();
    let (start, x_end, y_end) = match policy {
        BorderPolicy::SkipMissingNeighbors => (0, width, height),
        BorderPolicy::LeaveUnprocessed(band) => {
            (band, width.saturating_sub(band), height.saturating_sub(band))
        }
    };

    // Offsets beyond the larger dimension never land in bounds.
    let radius = radius.min(width.max(height).saturating_sub(1));
    let span = |len: u32| usize::try_from(radius.saturating_mul(2).saturating_add(1).min(len));
    let capacity = span(width).unwrap_or(0) * span(height).unwrap_or(0);
    let mut samples = Vec::with_capacity(capacity);
    let mut out = image.clone();

    for y in start..y_end {
        let rows = y.saturating_sub(radius)..=y.saturating_add(radius).min(height - 1);
        for x in start..x_end {
            samples.clear();
            let cols = x.saturating_sub(radius)..=x.saturating_add(radius).min(width - 1);
            for ny in rows.clone() {
                for nx in cols.clone() {
                    samples.push(Sample {
                        dx: offset(x, nx),
                        dy: offset(y, ny),
                        pixel: *image.get_pixel(nx, ny),
                    });
                }
            }
            let hood = Neighborhood {
                center: *image.get_pixel(x, y),
                samples: &samples,
            };
            out.put_pixel(x, y, f(&hood));
        }
    }

    out
}
