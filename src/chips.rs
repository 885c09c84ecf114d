use log::debug;

/// Square pixel window cut from a raster
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChipWindow {
    pub x: usize,
    pub y: usize,
    pub size: usize,
}

impl ChipWindow {
    /// Pixel-space corners in ring order: top-left, top-right, bottom-right, bottom-left
    pub fn corners(&self) -> [(f64, f64); 4] {
        let (x0, y0) = (self.x as f64, self.y as f64);
        let (x1, y1) = ((self.x + self.size) as f64, (self.y + self.size) as f64);
        [(x0, y0), (x1, y0), (x1, y1), (x0, y1)]
    }
}

/// Sliding grid of chips over a raster. Windows crossing the raster edge are not produced.
pub struct ChipGrid {
    chip_size: usize,
    step_size: usize,
    pub num_chips_x: usize,
    pub num_chips_y: usize,
    pub total_chips: usize,
}

impl ChipGrid {
    pub fn new(raster_width: usize, raster_height: usize, chip_size: usize, step_size: usize) -> Self {
        let num_chips_x = Self::steps_along(raster_width, chip_size, step_size);
        let num_chips_y = Self::steps_along(raster_height, chip_size, step_size);
        let total_chips = num_chips_x * num_chips_y;

        debug!(
            "ChipGrid: {}x{} raster, chip_size={}, step_size={} → {}x{} chips ({} total)",
            raster_width, raster_height, chip_size, step_size, num_chips_x, num_chips_y, total_chips
        );

        Self {
            chip_size,
            step_size,
            num_chips_x,
            num_chips_y,
            total_chips,
        }
    }

    fn steps_along(extent: usize, chip_size: usize, step_size: usize) -> usize {
        if chip_size == 0 || step_size == 0 || extent < chip_size {
            0
        } else {
            (extent - chip_size) / step_size + 1
        }
    }

    pub fn iter(&self) -> ChipIterator<'_> {
        ChipIterator::new(self)
    }

    /// Window at linear index `chip_idx` in row-major order, `None` past the last chip
    pub fn get_chip_window(&self, chip_idx: usize) -> Option<ChipWindow> {
        if chip_idx >= self.total_chips {
            return None;
        }
        let chip_y = chip_idx / self.num_chips_x;
        let chip_x = chip_idx % self.num_chips_x;

        Some(ChipWindow {
            x: chip_x * self.step_size,
            y: chip_y * self.step_size,
            size: self.chip_size,
        })
    }
}

pub struct ChipIterator<'a> {
    grid: &'a ChipGrid,
    current_idx: usize,
}

impl<'a> ChipIterator<'a> {
    fn new(grid: &'a ChipGrid) -> Self {
        Self {
            grid,
            current_idx: 0,
        }
    }
}

impl<'a> Iterator for ChipIterator<'a> {
    type Item = ChipWindow;

    fn next(&mut self) -> Option<Self::Item> {
        let window = self.grid.get_chip_window(self.current_idx)?;
        self.current_idx += 1;
        Some(window)
    }
}
