use crate::types::{BlockSize, SdrlError, SdrlResult, Window};

/// Clamps windows to raster bounds and splits a raster into block windows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowPlanner {
    width: usize,
    height: usize,
}

impl WindowPlanner {
    /// Planner for a `width` x `height` raster
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Truncate `window` so it ends inside the raster.
    ///
    /// The origin may sit anywhere in `[0, width] x [0, height]`; an origin on
    /// the far edge gives an empty window.
    pub fn clamp(&self, window: Window) -> SdrlResult<Window> {
        if window.x_offset > self.width || window.y_offset > self.height {
            return Err(SdrlError::InvalidWindow(format!(
                "origin ({}, {}) must be within [0-{}, 0-{}]",
                window.x_offset, window.y_offset, self.width, self.height
            )));
        }
        Ok(self.truncate(window))
    }

    fn truncate(&self, window: Window) -> Window {
        Window {
            width: window.width.min(self.width - window.x_offset),
            height: window.height.min(self.height - window.y_offset),
            ..window
        }
    }

    /// Row-major grid of block windows covering the whole raster
    pub fn tile(&self, block_size: BlockSize) -> SdrlResult<TileGrid> {
        if block_size.rows == 0 || block_size.cols == 0 {
            return Err(SdrlError::InvalidWindow(format!(
                "block size must be positive, got {}x{}",
                block_size.rows, block_size.cols
            )));
        }

        let rows = self.height.div_ceil(block_size.rows);
        let cols = self.width.div_ceil(block_size.cols);
        log::debug!(
            "Tiling {}x{} raster into {}x{} blocks of {}x{}",
            self.width,
            self.height,
            rows,
            cols,
            block_size.rows,
            block_size.cols
        );

        Ok(TileGrid {
            planner: *self,
            block_size,
            rows,
            cols,
            next: 0,
        })
    }
}

/// Lazy sequence of tile windows produced by [`WindowPlanner::tile`]
#[derive(Debug, Clone)]
pub struct TileGrid {
    planner: WindowPlanner,
    block_size: BlockSize,
    rows: usize,
    cols: usize,
    next: usize,
}

impl TileGrid {
    /// Grid dimensions as (tile rows, tile columns)
    pub fn grid_shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn block_size(&self) -> BlockSize {
        self.block_size
    }
}

impl Iterator for TileGrid {
    type Item = Window;

    fn next(&mut self) -> Option<Window> {
        if self.next >= self.rows * self.cols {
            return None;
        }
        let (row, col) = (self.next / self.cols, self.next % self.cols);
        self.next += 1;

        // Origins stay strictly inside the raster, truncation is enough
        Some(self.planner.truncate(Window::new(
            col * self.block_size.cols,
            row * self.block_size.rows,
            self.block_size.cols,
            self.block_size.rows,
        )))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.rows * self.cols - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for TileGrid {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_truncates_extent() {
        let planner = WindowPlanner::new(1000, 800);
        let clamped = planner.clamp(Window::new(900, 700, 512, 512)).unwrap();
        assert_eq!(clamped, Window::new(900, 700, 100, 100));

        let inside = Window::new(10, 20, 30, 40);
        assert_eq!(planner.clamp(inside).unwrap(), inside);
    }

    #[test]
    fn test_clamp_is_idempotent() {
        let planner = WindowPlanner::new(1000, 1000);
        for window in [
            Window::new(0, 0, 2000, 2000),
            Window::new(999, 0, 5, 5),
            Window::new(512, 512, 512, 512),
            Window::new(1000, 1000, 10, 10),
        ] {
            let once = planner.clamp(window).unwrap();
            assert_eq!(planner.clamp(once).unwrap(), once);
        }
    }

    #[test]
    fn test_clamp_origin_on_edge_is_empty() {
        let planner = WindowPlanner::new(100, 50);
        let clamped = planner.clamp(Window::new(100, 50, 10, 10)).unwrap();
        assert!(clamped.is_empty());
    }

    #[test]
    fn test_clamp_rejects_origin_outside() {
        let planner = WindowPlanner::new(100, 50);
        assert!(matches!(
            planner.clamp(Window::new(101, 0, 1, 1)),
            Err(SdrlError::InvalidWindow(_))
        ));
        assert!(planner.clamp(Window::new(0, 51, 1, 1)).is_err());
    }

    #[test]
    fn test_tile_1000_by_512() {
        let planner = WindowPlanner::new(1000, 1000);
        let tiles: Vec<Window> = planner.tile(BlockSize::new(512, 512)).unwrap().collect();
        assert_eq!(
            tiles,
            vec![
                Window::new(0, 0, 512, 512),
                Window::new(512, 0, 488, 512),
                Window::new(0, 512, 512, 488),
                Window::new(512, 512, 488, 488),
            ]
        );
    }

    #[test]
    fn test_tile_covers_raster_exactly() {
        let (width, height) = (37, 23);
        let block = BlockSize::new(10, 8);
        let grid = WindowPlanner::new(width, height).tile(block).unwrap();
        assert_eq!(grid.len(), 3 * 5);
        assert_eq!(grid.grid_shape(), (3, 5));

        let mut coverage = vec![0u32; width * height];
        for window in grid {
            assert!(window.width <= block.cols && window.height <= block.rows);
            for y in window.y_offset..window.y_end() {
                for x in window.x_offset..window.x_end() {
                    coverage[y * width + x] += 1;
                }
            }
        }
        assert!(coverage.iter().all(|&count| count == 1));
    }

    #[test]
    fn test_tile_row_major_order() {
        let grid = WindowPlanner::new(20, 20).tile(BlockSize::new(10, 10)).unwrap();
        let origins: Vec<(usize, usize)> = grid.map(|w| (w.x_offset, w.y_offset)).collect();
        assert_eq!(origins, vec![(0, 0), (10, 0), (0, 10), (10, 10)]);
    }

    #[test]
    fn test_tile_non_square_block() {
        // rows = ceil(30 / 16), cols = ceil(50 / 32)
        let tiles: Vec<Window> = WindowPlanner::new(50, 30)
            .tile(BlockSize::new(16, 32))
            .unwrap()
            .collect();
        assert_eq!(tiles.len(), 4);
        assert_eq!(tiles[1], Window::new(32, 0, 18, 16));
        assert_eq!(tiles[2], Window::new(0, 16, 32, 14));
    }

    #[test]
    fn test_tile_rejects_zero_block() {
        let planner = WindowPlanner::new(10, 10);
        assert!(matches!(
            planner.tile(BlockSize::new(0, 4)),
            Err(SdrlError::InvalidWindow(_))
        ));
    }

    #[test]
    fn test_tile_empty_raster() {
        assert_eq!(WindowPlanner::new(0, 0).tile(BlockSize::default()).unwrap().count(), 0);
    }
}
