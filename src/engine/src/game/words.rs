use super::grid::Grid;
use super::tile::Tile;

/// A maximal horizontal or vertical run of tiles, captured together with the
/// grid's drift at extraction time. Later padding moves every stored
/// coordinate, so presence and overlap checks re-project the run's start
/// through the drift delta instead of trusting the recorded position.
#[derive(Debug, Clone, PartialEq)]
pub struct Word {
    pub letters: Vec<Tile>,
    pub row: i32,
    pub col: i32,
    pub vertical: bool,
    drift: (i32, i32),
}

impl Word {
    pub fn text(&self) -> String {
        self.letters.iter().map(|tile| tile.value.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.letters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.letters.is_empty()
    }

    fn step(&self) -> (i32, i32) {
        if self.vertical {
            (1, 0)
        } else {
            (0, 1)
        }
    }

    /// The run's start in the grid's current storage coordinates.
    fn projected_start(&self, grid: &Grid) -> (i32, i32) {
        let (drift_row, drift_col) = grid.drift();
        (
            self.row + drift_row - self.drift.0,
            self.col + drift_col - self.drift.1,
        )
    }

    /// True when this run still exists on the grid exactly as extracted: the
    /// cells just before and after the run are empty and every letter matches
    /// by id. Guards against stale words after grid mutation.
    pub fn present(&self, grid: &Grid) -> bool {
        let (row, col) = self.projected_start(grid);
        let (dr, dc) = self.step();
        let len = self.letters.len() as i32;

        if grid.get(row - dr, col - dc).is_some() {
            return false;
        }
        if grid.get(row + dr * len, col + dc * len).is_some() {
            return false;
        }

        self.letters.iter().enumerate().all(|(offset, letter)| {
            let offset = offset as i32;
            grid.get(row + dr * offset, col + dc * offset)
                .is_some_and(|tile| tile.id == letter.id)
        })
    }

    /// True when the storage cell `(row, col)` falls inside this run after
    /// re-projection. Used to highlight cells of invalid words.
    pub fn covers(&self, grid: &Grid, row: i32, col: i32) -> bool {
        let (start_row, start_col) = self.projected_start(grid);
        let (dr, dc) = self.step();
        let len = self.letters.len() as i32;
        (0..len).any(|offset| (start_row + dr * offset, start_col + dc * offset) == (row, col))
    }
}

impl Grid {
    /// Extracts every maximal run: a vertical run starts at any occupied cell
    /// with nothing above it, a horizontal run at any cell with nothing to
    /// its left. A fully isolated tile is reported once as a length-1
    /// horizontal run; callers decide whether one-letter words count.
    pub fn words(&self) -> Vec<Word> {
        let mut words = Vec::new();

        for ((row, col), tile) in self.letter_positions() {
            let up = self.get(row - 1, col).is_some();
            let down = self.get(row + 1, col).is_some();
            let left = self.get(row, col - 1).is_some();
            let right = self.get(row, col + 1).is_some();

            if !up && down {
                let mut letters = vec![tile.clone()];
                let mut next = row + 1;
                while let Some(below) = self.get(next, col) {
                    letters.push(below.clone());
                    next += 1;
                }
                words.push(Word {
                    letters,
                    row,
                    col,
                    vertical: true,
                    drift: self.drift(),
                });
            }

            if !left && right {
                let mut letters = vec![tile.clone()];
                let mut next = col + 1;
                while let Some(beside) = self.get(row, next) {
                    letters.push(beside.clone());
                    next += 1;
                }
                words.push(Word {
                    letters,
                    row,
                    col,
                    vertical: false,
                    drift: self.drift(),
                });
            }

            if !up && !down && !left && !right {
                words.push(Word {
                    letters: vec![tile.clone()],
                    row,
                    col,
                    vertical: false,
                    drift: self.drift(),
                });
            }
        }

        words
    }
}
