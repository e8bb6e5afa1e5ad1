use serde::{Deserialize, Serialize};
use tracing::debug;

use super::tile::Tile;

/// A player's hand: an ordered sequence of tiles in which empty slots may
/// appear mid-sequence. Slot indices are stable anchors for whoever renders
/// the hand, so `delete` splices the slot out while `take` (used by swap)
/// leaves the hole behind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bank {
    slots: Vec<Option<Tile>>,
}

/// Wire form of one occupied slot: the tile plus its index. Holes are simply
/// not listed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankEntry {
    pub letter: Tile,
    pub pos: [usize; 1],
}

impl Bank {
    pub fn new() -> Self {
        Bank::default()
    }

    pub fn from_tiles(tiles: impl IntoIterator<Item = Tile>) -> Self {
        let mut bank = Bank::new();
        bank.add(tiles);
        bank
    }

    pub fn get(&self, index: usize) -> Option<&Tile> {
        self.slots.get(index).and_then(|slot| slot.as_ref())
    }

    /// Replaces an occupied slot in place. A write to an empty or
    /// out-of-range slot degrades to an append.
    pub fn set(&mut self, index: usize, tile: Tile) {
        match self.slots.get_mut(index) {
            Some(slot @ Some(_)) => *slot = Some(tile),
            _ => self.add([tile]),
        }
    }

    pub fn add(&mut self, tiles: impl IntoIterator<Item = Tile>) {
        for tile in tiles {
            self.slots.push(Some(tile));
        }
    }

    /// Splices the slot out, shifting every later index down by one.
    pub fn delete_at(&mut self, index: usize) -> Option<Tile> {
        if index >= self.slots.len() || self.slots[index].is_none() {
            debug!(index, "bank delete on an empty slot ignored");
            return None;
        }
        self.slots.remove(index)
    }

    pub fn delete(&mut self, tile_id: i64) -> Option<Tile> {
        let index = self.find_letter(tile_id)?;
        self.delete_at(index)
    }

    /// Empties the slot without shifting neighbors; the hole stays. Used by
    /// swap so the other indices a UI is holding onto remain valid.
    pub fn take(&mut self, index: usize) -> Option<Tile> {
        self.slots.get_mut(index).and_then(|slot| slot.take())
    }

    /// Writes at exactly this index, growing with holes as needed. The
    /// counterpart of `take`.
    pub fn put(&mut self, index: usize, tile: Tile) {
        if index >= self.slots.len() {
            self.slots.resize_with(index + 1, || None);
        }
        self.slots[index] = Some(tile);
    }

    pub fn find_letter(&self, tile_id: i64) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| slot.as_ref().is_some_and(|tile| tile.id == tile_id))
    }

    /// Every occupied slot with its index, in order.
    pub fn letter_positions(&self) -> Vec<(usize, &Tile)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|tile| (index, tile)))
            .collect()
    }

    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.slots.iter().filter_map(|slot| slot.as_ref())
    }

    /// True when no slot is occupied; trailing or interior holes don't count.
    pub fn is_empty(&self) -> bool {
        self.tiles().next().is_none()
    }

    pub fn tile_count(&self) -> usize {
        self.tiles().count()
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn serialize(&self) -> Vec<BankEntry> {
        self.letter_positions()
            .into_iter()
            .map(|(index, tile)| BankEntry {
                letter: tile.clone(),
                pos: [index],
            })
            .collect()
    }

    pub fn deserialize(entries: &[BankEntry]) -> Self {
        let mut bank = Bank::new();
        for entry in entries {
            bank.set(entry.pos[0], entry.letter.clone());
        }
        bank
    }
}
