use tracing::debug;

use super::bank::Bank;
use super::grid::Grid;
use super::tile::Tile;
use super::words::Word;
use crate::net::message::PlayerSnapshot;

/// An addressable slot in the session's tile storage. `Recall` and `Discard`
/// are interaction targets only; nothing is ever stored at them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    Grid { row: i32, col: i32 },
    Bank { index: usize },
    Recall,
    Discard,
}

/// One player's complete local game state: the placed grid, the in-hand bank,
/// and the most recent set of server-flagged invalid words.
///
/// Every mutation reads before it writes; an operation whose source location
/// is already empty is absorbed as a logged no-op, because message races
/// (a discard reply landing after a recall) are expected, not programming
/// errors.
#[derive(Debug, Clone, Default)]
pub struct GameState {
    pub grid: Grid,
    pub bank: Bank,
    /// Words most recently reported invalid, re-anchored to the live grid
    /// for highlighting.
    pub unwords: Vec<Word>,
}

impl GameState {
    pub fn new() -> Self {
        GameState::default()
    }

    /// Builds a read-only historical state (afterparty display) from a
    /// server snapshot: board and hand as sent, tightened to a zero margin,
    /// with the reported unwords reapplied.
    pub fn from_snapshot(snapshot: &PlayerSnapshot) -> Self {
        let mut state = GameState::new();
        if let Some(board) = &snapshot.board {
            state.grid = Grid::from_wire(board);
            state.grid.padding((0, 0));
        }
        if let Some(hand) = &snapshot.hand {
            state.bank = Bank::from_tiles(hand.iter().cloned());
        }
        state.check(&snapshot.unwords);
        state
    }

    pub fn get(&self, location: Location) -> Option<&Tile> {
        match location {
            Location::Grid { row, col } => self.grid.get(row, col),
            Location::Bank { index } => self.bank.get(index),
            Location::Recall | Location::Discard => None,
        }
    }

    pub fn set(&mut self, location: Location, tile: Tile) {
        match location {
            Location::Grid { row, col } => self.grid.set(row, col, tile),
            Location::Bank { index } => self.bank.set(index, tile),
            Location::Recall => self.bank.add([tile]),
            Location::Discard => debug!(tile_id = tile.id, "tile dropped at discard target"),
        }
    }

    pub fn delete(&mut self, location: Location) -> Option<Tile> {
        match location {
            Location::Grid { row, col } => self.grid.delete(row, col),
            Location::Bank { index } => self.bank.delete_at(index),
            Location::Recall | Location::Discard => None,
        }
    }

    /// Finds a tile by id, searching the grid before the bank.
    pub fn position_of(&self, tile_id: i64) -> Option<Location> {
        if let Some((row, col)) = self.grid.find_letter(tile_id) {
            return Some(Location::Grid { row, col });
        }
        self.bank
            .find_letter(tile_id)
            .map(|index| Location::Bank { index })
    }

    /// Every tile with its location, grid first (or bank first on request).
    pub fn letter_positions(&self, bank_first: bool) -> Vec<(Location, &Tile)> {
        let grid = self
            .grid
            .letter_positions()
            .into_iter()
            .map(|((row, col), tile)| (Location::Grid { row, col }, tile));
        let bank = self
            .bank
            .letter_positions()
            .into_iter()
            .map(|(index, tile)| (Location::Bank { index }, tile));

        if bank_first {
            bank.chain(grid).collect()
        } else {
            grid.chain(bank).collect()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.grid.is_empty() && self.bank.is_empty()
    }

    /// Appends freshly drawn tiles to the bank, skipping any id already
    /// present somewhere (duplicate deliveries happen under retries).
    /// Returns the tiles actually added.
    pub fn draw(&mut self, tiles: impl IntoIterator<Item = Tile>) -> Vec<Tile> {
        let mut added = Vec::new();
        for tile in tiles {
            if self.position_of(tile.id).is_some() {
                debug!(tile_id = tile.id, "duplicate draw delivery skipped");
                continue;
            }
            self.bank.add([tile.clone()]);
            added.push(tile);
        }
        added
    }

    /// Removes a tile from wherever it currently is. No replacement is added
    /// here; replacements arrive with the transport response.
    pub fn discard(&mut self, tile_id: i64) {
        match self.position_of(tile_id) {
            Some(location) => {
                self.delete(location);
            }
            None => debug!(tile_id, "discard of an absent tile ignored"),
        }
    }

    /// Moves a tile from the grid back to the tail of the bank.
    pub fn recall(&mut self, tile_id: i64) {
        match self.grid.find_letter(tile_id) {
            Some((row, col)) => {
                if let Some(tile) = self.grid.delete(row, col) {
                    self.bank.add([tile]);
                }
            }
            None => debug!(tile_id, "recall of a tile not on the grid ignored"),
        }
    }

    fn take(&mut self, location: Location) -> Option<Tile> {
        match location {
            Location::Grid { row, col } => self.grid.delete(row, col),
            // Swap must not shift the hand, so the slot stays as a hole.
            Location::Bank { index } => self.bank.take(index),
            Location::Recall | Location::Discard => None,
        }
    }

    fn put(&mut self, location: Location, tile: Tile) {
        match location {
            Location::Grid { row, col } => self.grid.set(row, col, tile),
            Location::Bank { index } => self.bank.put(index, tile),
            Location::Recall => self.bank.add([tile]),
            Location::Discard => {}
        }
    }

    /// Exchanges the tiles at two locations, in place, across the grid/bank
    /// boundary. With one side empty this degrades to a move; a vacated bank
    /// slot is left as a hole so the other indices stay valid.
    pub fn swap(&mut self, first: Location, second: Location) {
        let a = self.take(first);
        let b = self.take(second);

        if a.is_none() && b.is_none() {
            debug!(?first, ?second, "swap between two empty locations ignored");
            return;
        }

        if let Some(tile) = b {
            self.put(first, tile);
        }
        if let Some(tile) = a {
            self.put(second, tile);
        }
    }

    /// Relocates a grid tile to another grid cell.
    pub fn move_tile(&mut self, tile_id: i64, row: i32, col: i32) {
        let Some((old_row, old_col)) = self.grid.find_letter(tile_id) else {
            debug!(tile_id, "move of a tile not on the grid ignored");
            return;
        };
        if (old_row, old_col) == (row, col) {
            return;
        }
        if self.grid.get(row, col).is_some() {
            debug!(tile_id, row, col, "move onto an occupied cell ignored");
            return;
        }
        if let Some(tile) = self.grid.delete(old_row, old_col) {
            self.grid.set(row, col, tile);
        }
    }

    /// Plays a bank tile onto an empty grid cell.
    pub fn play(&mut self, tile_id: i64, row: i32, col: i32) {
        let Some(index) = self.bank.find_letter(tile_id) else {
            debug!(tile_id, "play of a tile not in the bank ignored");
            return;
        };
        if self.grid.get(row, col).is_some() {
            debug!(tile_id, row, col, "play onto an occupied cell ignored");
            return;
        }
        if let Some(tile) = self.bank.delete_at(index) {
            self.grid.set(row, col, tile);
        }
    }

    /// Recomputes the grid's candidate words and keeps the subset whose text
    /// the server reported invalid. The retained list replaces any previous
    /// one and is what a UI highlights.
    pub fn check(&mut self, invalid: &[String]) -> &[Word] {
        self.unwords.clear();
        if !invalid.is_empty() {
            for word in self.grid.words() {
                let text = word.text();
                if invalid.iter().any(|bad| bad.eq_ignore_ascii_case(&text)) {
                    self.unwords.push(word);
                }
            }
        }
        &self.unwords
    }
}
