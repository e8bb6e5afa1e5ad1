use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::tile::{Pos, Tile};

/// Sparse letter grid with a drift-tracked origin.
///
/// Cells are keyed by storage coordinates `(row, col)`. `drift` records how
/// far the storage origin has moved from the server's logical origin since
/// creation: a stored `(r, c)` is logical `(r - drift.0, c - drift.1)`.
/// Padding is the only operation that moves the origin.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grid {
    cells: BTreeMap<(i32, i32), Tile>,
    rows: i32,
    cols: i32,
    drift: (i32, i32),
}

/// Wire form of a board: the tile list plus logical positions keyed by tile
/// id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoardWire {
    #[serde(default)]
    pub tiles: Vec<Tile>,
    #[serde(default)]
    pub positions: HashMap<i64, Pos>,
}

impl Grid {
    pub fn new() -> Self {
        Grid::default()
    }

    /// Current display row count: 1 + the highest populated row, plus any
    /// padding rows established by `padding`.
    pub fn rows(&self) -> i32 {
        self.rows
    }

    pub fn cols(&self) -> i32 {
        self.cols
    }

    pub fn drift(&self) -> (i32, i32) {
        self.drift
    }

    pub fn get(&self, row: i32, col: i32) -> Option<&Tile> {
        self.cells.get(&(row, col))
    }

    /// Writes a tile, growing the display dimensions to cover it.
    pub fn set(&mut self, row: i32, col: i32, tile: Tile) {
        self.cells.insert((row, col), tile);
        self.rows = self.rows.max(row + 1);
        self.cols = self.cols.max(col + 1);
    }

    pub fn delete(&mut self, row: i32, col: i32) -> Option<Tile> {
        self.cells.remove(&(row, col))
    }

    pub fn find_letter(&self, tile_id: i64) -> Option<(i32, i32)> {
        self.cells
            .iter()
            .find(|(_, tile)| tile.id == tile_id)
            .map(|(&pos, _)| pos)
    }

    /// Every occupied cell with its storage position, in row-major order.
    pub fn letter_positions(&self) -> Vec<((i32, i32), &Tile)> {
        self.cells.iter().map(|(&pos, tile)| (pos, tile)).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn tile_count(&self) -> usize {
        self.cells.len()
    }

    /// Converts a storage position to the server-logical coordinates used on
    /// the wire.
    pub fn logical(&self, row: i32, col: i32) -> Pos {
        Pos::new(col - self.drift.1, row - self.drift.0)
    }

    /// Converts wire coordinates back into storage coordinates.
    pub fn storage(&self, pos: Pos) -> (i32, i32) {
        (pos.y + self.drift.0, pos.x + self.drift.1)
    }

    /// Tight bounding box of the occupied cells as
    /// `(min_row, end_row, min_col, end_col)` with exclusive ends, or `None`
    /// for an empty grid.
    fn bounds(&self) -> Option<(i32, i32, i32, i32)> {
        let mut bounds: Option<(i32, i32, i32, i32)> = None;
        for &(row, col) in self.cells.keys() {
            bounds = Some(match bounds {
                None => (row, row + 1, col, col + 1),
                Some((min_r, end_r, min_c, end_c)) => (
                    min_r.min(row),
                    end_r.max(row + 1),
                    min_c.min(col),
                    end_c.max(col + 1),
                ),
            });
        }
        bounds
    }

    /// Re-establishes exactly `amt` empty rows/columns around the occupied
    /// region, growing or trimming each side as needed.
    ///
    /// Two phases: the target geometry is computed from the bounding box
    /// first, then every cell is reallocated into a fresh backing map shifted
    /// by the resulting delta. The delta is added to `drift` and returned so
    /// callers can adjust cached storage coordinates (selection, scroll) the
    /// same way. Padding an already-padded grid returns `(0, 0)`.
    pub fn padding(&mut self, amt: (i32, i32)) -> (i32, i32) {
        let amt = (amt.0.max(0), amt.1.max(0));

        let Some((min_r, end_r, min_c, end_c)) = self.bounds() else {
            let delta = (amt.0 - self.rows, amt.1 - self.cols);
            self.rows = amt.0;
            self.cols = amt.1;
            self.drift.0 += delta.0;
            self.drift.1 += delta.1;
            return delta;
        };

        let delta = (amt.0 - min_r, amt.1 - min_c);
        if delta != (0, 0) {
            let old = std::mem::take(&mut self.cells);
            for ((row, col), tile) in old {
                self.cells.insert((row + delta.0, col + delta.1), tile);
            }
        }

        self.rows = (end_r - min_r) + 2 * amt.0;
        self.cols = (end_c - min_c) + 2 * amt.1;
        self.drift.0 += delta.0;
        self.drift.1 += delta.1;
        delta
    }

    /// Groups occupied cells into maximal 4-adjacent connected components.
    ///
    /// Incremental union scan: cells arrive in row-major order, so only the
    /// cell above and the cell to the left can already belong to a component.
    /// Used for the "all placed tiles form one mass" draw precondition.
    pub fn components(&self) -> Vec<Vec<(i32, i32)>> {
        let mut components: Vec<Vec<(i32, i32)>> = Vec::new();

        for &(row, col) in self.cells.keys() {
            let up = components
                .iter()
                .position(|c| c.contains(&(row - 1, col)));
            let left = components
                .iter()
                .position(|c| c.contains(&(row, col - 1)));

            match (up, left) {
                (Some(up), Some(left)) if up != left => {
                    let absorbed = components.remove(left);
                    let up = if left < up { up - 1 } else { up };
                    components[up].extend(absorbed);
                    components[up].push((row, col));
                }
                (Some(joined), _) | (None, Some(joined)) => {
                    components[joined].push((row, col));
                }
                (None, None) => components.push(vec![(row, col)]),
            }
        }

        for component in &mut components {
            component.sort_unstable();
        }
        components
    }

    /// Serializes to the wire shape; positions are logical
    /// (drift-compensated) coordinates.
    pub fn to_wire(&self) -> BoardWire {
        let mut wire = BoardWire::default();
        for (&(row, col), tile) in self.cells.iter() {
            wire.tiles.push(tile.clone());
            wire.positions.insert(tile.id, self.logical(row, col));
        }
        wire
    }

    /// Rebuilds a grid from the wire shape, shifting the occupied region so
    /// its bounding origin lands at storage `(0, 0)`. The applied shift is
    /// recorded as drift, so re-serializing reproduces the logical positions.
    pub fn from_wire(wire: &BoardWire) -> Self {
        let mut grid = Grid::new();
        if wire.tiles.is_empty() {
            return grid;
        }

        let adj_row = -wire.positions.values().map(|pos| pos.y).min().unwrap_or(0);
        let adj_col = -wire.positions.values().map(|pos| pos.x).min().unwrap_or(0);
        grid.drift = (adj_row, adj_col);

        for tile in &wire.tiles {
            match wire.positions.get(&tile.id) {
                Some(pos) => grid.set(pos.y + adj_row, pos.x + adj_col, tile.clone()),
                None => debug!(tile_id = tile.id, "board tile without a position dropped"),
            }
        }
        grid
    }
}
