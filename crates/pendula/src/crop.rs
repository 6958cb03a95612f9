//! Sub-grid selection for the magnified view.
//!
//! An origin `(x, y) ∈ [0, 1]²` maps to the top-left cell
//! `(⌊y·H⌋, ⌊x·W⌋)`. The origin is clamped so the whole window stays
//! inside the grid; origins outside `[0, 1]` behave like the nearest edge.

use pendula_model::{Error, Grid, Result, SimParams};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropWindow {
    /// Normalised origin, `[x, y]`.
    pub origin: [f64; 2],
    pub width: usize,
    pub height: usize,
}

impl CropWindow {
    pub fn new(origin: [f64; 2], width: i32, height: i32) -> Result<Self> {
        if width <= 0 || height <= 0 {
            return Err(Error::InvalidCrop {
                width: width as i64,
                height: height as i64,
            });
        }
        Ok(Self {
            origin,
            width: width as usize,
            height: height as usize,
        })
    }

    pub fn from_params(params: &SimParams) -> Result<Self> {
        Self::new(
            params.crop_origin,
            params.sub_grid_width,
            params.sub_grid_height,
        )
    }

    /// Reject a window that cannot fit in a `grid_width × grid_height` grid.
    pub fn check_fits(&self, grid_width: usize, grid_height: usize) -> Result<()> {
        if self.width > grid_width || self.height > grid_height {
            return Err(Error::CropTooLarge {
                crop_width: self.width,
                crop_height: self.height,
                grid_width,
                grid_height,
            });
        }
        Ok(())
    }

    /// Clamped top-left `(row, col)` within a grid of the given size.
    pub fn top_left(&self, grid_width: usize, grid_height: usize) -> Result<(usize, usize)> {
        self.check_fits(grid_width, grid_height)?;
        let col = clamped_start(self.origin[0], grid_width, self.width);
        let row = clamped_start(self.origin[1], grid_height, self.height);
        Ok((row, col))
    }

    /// Copy the selected block out of `grid`.
    pub fn select(&self, grid: &Grid) -> Result<Grid> {
        let (row, col) = self.top_left(grid.width(), grid.height())?;
        Ok(grid.sub_grid(row, col, self.width, self.height))
    }
}

fn clamped_start(fraction: f64, extent: usize, span: usize) -> usize {
    // NaN saturates to 0 in the cast.
    let start = (fraction * extent as f64).floor() as i64;
    start.clamp(0, (extent - span) as i64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use pendula_model::AngleWindow;

    fn grid() -> Grid {
        Grid::seeded(8, 6, &AngleWindow::default())
    }

    #[test]
    fn test_full_grid_round_trip() {
        let g = grid();
        let crop = CropWindow::new([0.0, 0.0], 8, 6).unwrap();
        assert_eq!(crop.select(&g).unwrap(), g);
    }

    #[test]
    fn test_origin_maps_to_floor() {
        let crop = CropWindow::new([0.5, 0.5], 2, 2).unwrap();
        assert_eq!(crop.top_left(8, 6).unwrap(), (3, 4));

        let sub = crop.select(&grid()).unwrap();
        assert_eq!(sub.get(0, 0), grid().get(3, 4));
    }

    #[test]
    fn test_far_edge_is_clamped() {
        let crop = CropWindow::new([1.0, 0.99], 3, 2).unwrap();
        assert_eq!(crop.top_left(8, 6).unwrap(), (4, 5));

        let crop = CropWindow::new([-0.3, f64::NAN], 3, 2).unwrap();
        assert_eq!(crop.top_left(8, 6).unwrap(), (0, 0));
    }

    #[test]
    fn test_invalid_sizes() {
        assert!(matches!(
            CropWindow::new([0.0, 0.0], 0, 2),
            Err(Error::InvalidCrop { .. })
        ));
        let crop = CropWindow::new([0.0, 0.0], 9, 1).unwrap();
        assert!(matches!(
            crop.select(&grid()),
            Err(Error::CropTooLarge { .. })
        ));
    }

    mod prop_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn window_stays_inside_grid(
                x in -1.0..2.0_f64,
                y in -1.0..2.0_f64,
                grid_w in 1usize..40,
                grid_h in 1usize..40,
                sub_w in 1i32..40,
                sub_h in 1i32..40,
            ) {
                let crop = CropWindow::new([x, y], sub_w, sub_h).unwrap();
                match crop.top_left(grid_w, grid_h) {
                    Ok((row, col)) => {
                        prop_assert!(row + crop.height <= grid_h);
                        prop_assert!(col + crop.width <= grid_w);
                    }
                    Err(_) => prop_assert!(crop.width > grid_w || crop.height > grid_h),
                }
            }
        }
    }
}
