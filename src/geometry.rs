//! Grid geometry.
//!
//! The overlay divides the usable desktop into a fixed `columns × rows`
//! grid.  Cells are addressed **1-indexed** (`row` in `1..=rows`, `col` in
//! `1..=columns`).  Everything in this module is pure: no window system,
//! no state.
//!
//! Cell sizes use truncating integer division, so the right and bottom
//! remainder pixels of the screen are never covered by a selection.  The
//! same cell size is used for position and extent so results are
//! deterministic.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error from constructing grid geometry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GeometryError {
    #[error("grid must have at least one column and one row (got {columns}x{rows})")]
    InvalidDimensions { columns: u32, rows: u32 },
}

/// Number of columns and rows in the selection grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridDimensions {
    columns: u32,
    rows: u32,
}

impl Default for GridDimensions {
    /// 8 columns by 4 rows.
    fn default() -> Self {
        Self {
            columns: 8,
            rows: 4,
        }
    }
}

impl GridDimensions {
    /// Build grid dimensions; both values must be at least 1.
    pub fn new(columns: u32, rows: u32) -> Result<Self, GeometryError> {
        if columns == 0 || rows == 0 {
            return Err(GeometryError::InvalidDimensions { columns, rows });
        }
        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> u32 {
        self.columns
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    /// Total number of cells.
    pub fn len(&self) -> usize {
        self.columns as usize * self.rows as usize
    }

    /// Always `false`; a grid has at least one cell.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Whether `cell` lies inside the grid.
    pub fn contains(&self, cell: Cell) -> bool {
        (1..=self.rows).contains(&cell.row) && (1..=self.columns).contains(&cell.col)
    }

    /// Row-major index of `cell` (0-based), for flat per-cell storage.
    pub fn index_of(&self, cell: Cell) -> usize {
        (cell.row as usize - 1) * self.columns as usize + (cell.col as usize - 1)
    }

    /// Iterate every cell, row by row.
    pub fn cells(&self) -> impl Iterator<Item = Cell> {
        let columns = self.columns;
        (1..=self.rows).flat_map(move |row| (1..=columns).map(move |col| Cell::new(row, col)))
    }
}

/// Pixel size of the usable desktop area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScreenBounds {
    pub width: u32,
    pub height: u32,
}

impl ScreenBounds {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// One grid cell, 1-indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub row: u32,
    pub col: u32,
}

impl Cell {
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// A selection expressed as inclusive, sorted row and column bounds.
///
/// Invariant: `min_row <= max_row` and `min_col <= max_col`.  The only way
/// to build one is [`NormalizedRegion::spanning`], which sorts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NormalizedRegion {
    min_row: u32,
    max_row: u32,
    min_col: u32,
    max_col: u32,
}

impl NormalizedRegion {
    /// The smallest region containing both `a` and `b`, independent of
    /// which one the drag started on.
    pub fn spanning(a: Cell, b: Cell) -> Self {
        Self {
            min_row: a.row.min(b.row),
            max_row: a.row.max(b.row),
            min_col: a.col.min(b.col),
            max_col: a.col.max(b.col),
        }
    }

    /// The region covering every cell of `dimensions`.
    pub fn full(dimensions: GridDimensions) -> Self {
        Self::spanning(
            Cell::new(1, 1),
            Cell::new(dimensions.rows(), dimensions.columns()),
        )
    }

    /// `(min_row, max_row)`.
    pub fn row_range(&self) -> (u32, u32) {
        (self.min_row, self.max_row)
    }

    /// `(min_col, max_col)`.
    pub fn col_range(&self) -> (u32, u32) {
        (self.min_col, self.max_col)
    }

    pub fn contains(&self, cell: Cell) -> bool {
        (self.min_row..=self.max_row).contains(&cell.row)
            && (self.min_col..=self.max_col).contains(&cell.col)
    }
}

impl fmt::Display for NormalizedRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rows {}..={} cols {}..={}",
            self.min_row, self.max_row, self.min_col, self.max_col
        )
    }
}

/// A rectangle in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

impl fmt::Display for PixelRect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}+{}+{}", self.width, self.height, self.x, self.y)
    }
}

/// Width and height of a single cell in pixels.
pub fn cell_size(dimensions: GridDimensions, bounds: ScreenBounds) -> (u32, u32) {
    (
        bounds.width / dimensions.columns(),
        bounds.height / dimensions.rows(),
    )
}

/// Map a normalized region to the screen rectangle it covers.
pub fn region_to_pixel_rect(
    region: NormalizedRegion,
    dimensions: GridDimensions,
    bounds: ScreenBounds,
) -> PixelRect {
    let (cell_width, cell_height) = cell_size(dimensions, bounds);
    let (min_row, max_row) = region.row_range();
    let (min_col, max_col) = region.col_range();

    PixelRect {
        x: ((min_col - 1) * cell_width) as i32,
        y: ((min_row - 1) * cell_height) as i32,
        width: cell_width * (max_col - min_col + 1),
        height: cell_height * (max_row - min_row + 1),
    }
}

/// Hit-test a point on the overlay's grid surface.
///
/// `surface_width` × `surface_height` is the size of the widget the grid
/// is drawn into (not the screen).  Points outside the surface, including
/// negative coordinates during a drag that leaves the overlay, clamp to
/// the nearest edge cell so the result is always inside the grid.
pub fn cell_at(
    x: f64,
    y: f64,
    dimensions: GridDimensions,
    surface_width: f64,
    surface_height: f64,
) -> Cell {
    fn axis(pos: f64, extent: f64, count: u32) -> u32 {
        if extent <= 0.0 || !pos.is_finite() {
            return 1;
        }
        let index = (pos / extent * count as f64).floor();
        (index.max(0.0) as u32).min(count - 1) + 1
    }

    Cell::new(
        axis(y, surface_height, dimensions.rows()),
        axis(x, surface_width, dimensions.columns()),
    )
}

/// Like [`cell_at`], for a homogeneous grid whose cells are separated by
/// `spacing` pixels.  Each cell then repeats every `(extent + spacing) / n`
/// pixels; a point on a gap belongs to the cell before it.
pub fn cell_at_spaced(
    x: f64,
    y: f64,
    dimensions: GridDimensions,
    surface_width: f64,
    surface_height: f64,
    spacing: f64,
) -> Cell {
    if surface_width <= 0.0 || surface_height <= 0.0 {
        return Cell::new(1, 1);
    }
    cell_at(
        x,
        y,
        dimensions,
        surface_width + spacing,
        surface_height + spacing,
    )
}

/// Rectangle of an overlay frame of `width` × `height` centered in `bounds`.
pub fn centered_frame(bounds: ScreenBounds, width: u32, height: u32) -> PixelRect {
    let x = bounds.width.saturating_sub(width) / 2;
    let y = bounds.height.saturating_sub(height) / 2;
    PixelRect::new(x as i32, y as i32, width, height)
}
