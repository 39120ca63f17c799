//! Block shapes: fixed-size matrices, clockwise rotation, catalog and generation.

use crate::game::Cell;
use rand::Rng;

/// Largest extent of a shape in either direction.
pub const MAX_SHAPE_DIM: usize = 4;

/// Shape matrix stored in a fixed 4x4 array; only `rows x cols` is meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shape {
    cells: [[Cell; MAX_SHAPE_DIM]; MAX_SHAPE_DIM],
    rows: usize,
    cols: usize,
}

impl Shape {
    /// Build an unstamped shape from a 0/1 mask. Filled sub-cells get colour 1.
    ///
    /// Panics if the mask is empty, ragged or larger than 4x4; catalogs are
    /// static data so this only fires on a programming error.
    pub fn from_mask(mask: &[&[u8]]) -> Self {
        let rows = mask.len();
        let cols = mask.first().map_or(0, |r| r.len());
        assert!(
            (1..=MAX_SHAPE_DIM).contains(&rows) && (1..=MAX_SHAPE_DIM).contains(&cols),
            "shape mask must be between 1x1 and 4x4"
        );
        let mut cells = [[Cell::Empty; MAX_SHAPE_DIM]; MAX_SHAPE_DIM];
        for (r, row) in mask.iter().enumerate() {
            assert_eq!(row.len(), cols, "shape mask rows must have equal length");
            for (c, &v) in row.iter().enumerate() {
                if v != 0 {
                    cells[r][c] = Cell::Filled(1);
                }
            }
        }
        Self { cells, rows, cols }
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Sub-cell at (row, col); `Empty` outside the shape's extent.
    #[inline]
    pub fn get(&self, r: usize, c: usize) -> Cell {
        if r < self.rows && c < self.cols {
            self.cells[r][c]
        } else {
            Cell::Empty
        }
    }

    /// Filled sub-cells as (row, col, colour).
    pub fn filled(&self) -> impl Iterator<Item = (usize, usize, u8)> + '_ {
        (0..self.rows).flat_map(move |r| {
            (0..self.cols).filter_map(move |c| match self.get(r, c) {
                Cell::Filled(color) => Some((r, c, color)),
                Cell::Empty => None,
            })
        })
    }

    /// Clockwise rotation: transpose of the row-reversed matrix.
    pub fn rotated_cw(&self) -> Self {
        let mut cells = [[Cell::Empty; MAX_SHAPE_DIM]; MAX_SHAPE_DIM];
        for (i, row) in cells.iter_mut().enumerate().take(self.cols) {
            for (j, cell) in row.iter_mut().enumerate().take(self.rows) {
                *cell = self.cells[self.rows - 1 - j][i];
            }
        }
        Self {
            cells,
            rows: self.cols,
            cols: self.rows,
        }
    }

    /// Same geometry with every filled sub-cell set to `color`.
    pub fn stamped(&self, color: u8) -> Self {
        let mut out = *self;
        for row in &mut out.cells {
            for cell in row {
                if let Cell::Filled(_) = cell {
                    *cell = Cell::Filled(color);
                }
            }
        }
        out
    }

    /// Colour shared by the filled sub-cells, if any.
    pub fn color(&self) -> Option<u8> {
        self.filled().next().map(|(_, _, color)| color)
    }
}

/// Fixed set of piece geometries blocks are drawn from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeCatalog {
    shapes: Vec<Shape>,
}

impl ShapeCatalog {
    /// The seven tetrominoes (I, O, T, S, Z, J, L), flat side down.
    pub fn standard() -> Self {
        Self::new(vec![
            Shape::from_mask(&[&[1, 1, 1, 1]]),
            Shape::from_mask(&[&[1, 1], &[1, 1]]),
            Shape::from_mask(&[&[0, 1, 0], &[1, 1, 1]]),
            Shape::from_mask(&[&[0, 1, 1], &[1, 1, 0]]),
            Shape::from_mask(&[&[1, 1, 0], &[0, 1, 1]]),
            Shape::from_mask(&[&[1, 0, 0], &[1, 1, 1]]),
            Shape::from_mask(&[&[0, 0, 1], &[1, 1, 1]]),
        ])
    }

    /// Panics on an empty list.
    pub fn new(shapes: Vec<Shape>) -> Self {
        assert!(!shapes.is_empty(), "shape catalog must not be empty");
        Self { shapes }
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    /// Widest extent over all shapes and all of their rotations.
    pub fn max_extent(&self) -> usize {
        self.shapes
            .iter()
            .map(|s| s.rows().max(s.cols()))
            .max()
            .unwrap_or(1)
    }
}

impl Default for ShapeCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

/// Random catalog shape stamped with a random colour in `1..color_count`.
///
/// Panics if `color_count < 2`; `GameConfig::validate` rejects that.
pub fn generate_block<R: Rng + ?Sized>(
    catalog: &ShapeCatalog,
    color_count: u8,
    rng: &mut R,
) -> Shape {
    let shapes = catalog.shapes();
    let shape = shapes[rng.gen_range(0..shapes.len())];
    let color = rng.gen_range(1..color_count);
    shape.stamped(color)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashMap;

    fn mask_of(shape: &Shape) -> Vec<Vec<u8>> {
        (0..shape.rows())
            .map(|r| {
                (0..shape.cols())
                    .map(|c| u8::from(shape.get(r, c) != Cell::Empty))
                    .collect()
            })
            .collect()
    }

    #[test]
    fn test_rotate_t_clockwise() {
        let t = Shape::from_mask(&[&[0, 1, 0], &[1, 1, 1]]);
        let r = t.rotated_cw();
        assert_eq!((r.rows(), r.cols()), (3, 2));
        assert_eq!(mask_of(&r), vec![vec![1, 0], vec![1, 1], vec![1, 0]]);
    }

    #[test]
    fn test_rotate_i_swaps_extents() {
        let i = Shape::from_mask(&[&[1, 1, 1, 1]]);
        let r = i.rotated_cw();
        assert_eq!((r.rows(), r.cols()), (4, 1));
        assert_eq!(r.filled().count(), 4);
    }

    #[test]
    fn test_four_rotations_identity() {
        for shape in ShapeCatalog::standard().shapes() {
            let back = shape.rotated_cw().rotated_cw().rotated_cw().rotated_cw();
            assert_eq!(&back, shape);
        }
    }

    #[test]
    fn test_rotation_keeps_colour() {
        let l = Shape::from_mask(&[&[0, 0, 1], &[1, 1, 1]]).stamped(5);
        let r = l.rotated_cw();
        assert!(r.filled().all(|(_, _, c)| c == 5));
        assert_eq!(r.color(), Some(5));
    }

    #[test]
    fn test_stamped_leaves_holes_empty() {
        let s = Shape::from_mask(&[&[0, 1, 1], &[1, 1, 0]]).stamped(3);
        assert_eq!(s.get(0, 0), Cell::Empty);
        assert_eq!(s.get(1, 2), Cell::Empty);
        assert_eq!(s.get(0, 1), Cell::Filled(3));
        assert_eq!(s.filled().count(), 4);
    }

    #[test]
    fn test_get_outside_extent_is_empty() {
        let o = Shape::from_mask(&[&[1, 1], &[1, 1]]);
        assert_eq!(o.get(2, 0), Cell::Empty);
        assert_eq!(o.get(0, 3), Cell::Empty);
    }

    #[test]
    fn test_standard_catalog() {
        let cat = ShapeCatalog::standard();
        assert_eq!(cat.shapes().len(), 7);
        assert_eq!(cat.max_extent(), 4);
        assert!(cat.shapes().iter().all(|s| s.filled().count() == 4));
    }

    #[test]
    #[should_panic(expected = "must not be empty")]
    fn test_empty_catalog_panics() {
        let _ = ShapeCatalog::new(Vec::new());
    }

    #[test]
    fn test_generate_block_uniform() {
        let cat = ShapeCatalog::standard();
        let colors = 8u8;
        let mut rng = StdRng::seed_from_u64(7);
        let n = 14_000;
        let mut by_shape: HashMap<Vec<Vec<u8>>, u32> = HashMap::new();
        let mut by_color: HashMap<u8, u32> = HashMap::new();
        for _ in 0..n {
            let b = generate_block(&cat, colors, &mut rng);
            *by_shape.entry(mask_of(&b)).or_default() += 1;
            let c = b.color().unwrap();
            assert!((1..colors).contains(&c));
            *by_color.entry(c).or_default() += 1;
        }
        assert_eq!(by_shape.len(), 7);
        assert_eq!(by_color.len(), 7);
        // expected 2000 each; allow +-15%
        for count in by_shape.values().chain(by_color.values()) {
            assert!((1700..=2300).contains(count), "skewed count {count}");
        }
    }

    #[test]
    fn test_generate_block_single_colour_range() {
        let cat = ShapeCatalog::standard();
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..50 {
            assert_eq!(generate_block(&cat, 2, &mut rng).color(), Some(1));
        }
    }

    #[test]
    #[should_panic(expected = "cannot sample empty range")]
    fn test_generate_block_needs_a_colour() {
        let mut rng = StdRng::seed_from_u64(1);
        generate_block(&ShapeCatalog::standard(), 1, &mut rng);
    }
}
