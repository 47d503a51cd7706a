use serde::{Deserialize, Serialize};

use crate::catalog::BuildingKind;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    pub x: usize,
    pub y: usize,
    pub kind: BuildingKind,
    pub level: u32,
    pub damaged: bool,
}

impl Tile {
    fn empty(x: usize, y: usize) -> Self {
        Self {
            x,
            y,
            kind: BuildingKind::Empty,
            level: 1,
            damaged: false,
        }
    }

    pub fn is_occupied(&self) -> bool {
        !self.kind.is_empty()
    }

    fn merged(&self, patch: &TilePatch) -> Tile {
        let kind = patch.kind.unwrap_or(self.kind);
        if kind.is_empty() {
            return Tile::empty(self.x, self.y);
        }
        Tile {
            x: self.x,
            y: self.y,
            kind,
            level: patch.level.unwrap_or(self.level).max(1),
            damaged: patch.damaged.unwrap_or(self.damaged),
        }
    }
}

/// Partial tile update. Unset fields keep the current value; coordinates are never patched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TilePatch {
    pub kind: Option<BuildingKind>,
    pub level: Option<u32>,
    pub damaged: Option<bool>,
}

impl TilePatch {
    pub fn cleared() -> Self {
        Self {
            kind: Some(BuildingKind::Empty),
            level: Some(1),
            damaged: Some(false),
        }
    }

    pub fn building(kind: BuildingKind) -> Self {
        Self {
            kind: Some(kind),
            level: Some(1),
            damaged: Some(false),
        }
    }

    pub fn level(level: u32) -> Self {
        Self {
            level: Some(level),
            ..Self::default()
        }
    }

    pub fn damaged(damaged: bool) -> Self {
        Self {
            damaged: Some(damaged),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    #[error("tile ({x}, {y}) is outside the {size}x{size} grid")]
    OutOfBounds { x: usize, y: usize, size: usize },
}

/// Square, row-major tile store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    size: usize,
    tiles: Vec<Tile>,
}

impl Grid {
    pub fn new(size: usize) -> Self {
        let mut tiles = Vec::with_capacity(size * size);
        for y in 0..size {
            for x in 0..size {
                tiles.push(Tile::empty(x, y));
            }
        }
        Self { size, tiles }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn get(&self, x: usize, y: usize) -> Result<&Tile, GridError> {
        let index = self.index(x, y)?;
        Ok(&self.tiles[index])
    }

    pub fn set(&mut self, x: usize, y: usize, patch: TilePatch) -> Result<(), GridError> {
        let index = self.index(x, y)?;
        let next = self.tiles[index].merged(&patch);
        self.tiles[index] = next;
        Ok(())
    }

    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.iter()
    }

    /// Coordinates of every occupied, non-road tile in row-major order.
    pub fn structure_sites(&self) -> Vec<(usize, usize)> {
        self.tiles
            .iter()
            .filter(|tile| tile.kind.is_structure())
            .map(|tile| (tile.x, tile.y))
            .collect()
    }

    /// The 3x3 block centred on `(x, y)`, clipped to the grid.
    pub fn neighborhood(&self, x: usize, y: usize) -> Vec<(usize, usize)> {
        let mut cells = Vec::with_capacity(9);
        for ny in y.saturating_sub(1)..=(y + 1).min(self.size.saturating_sub(1)) {
            for nx in x.saturating_sub(1)..=(x + 1).min(self.size.saturating_sub(1)) {
                cells.push((nx, ny));
            }
        }
        cells
    }

    pub fn occupied_count(&self) -> usize {
        self.tiles.iter().filter(|tile| tile.is_occupied()).count()
    }

    pub fn count_of(&self, kind: BuildingKind) -> usize {
        self.tiles.iter().filter(|tile| tile.kind == kind).count()
    }

    /// Empty tiles sit at level 1 and are never damaged.
    pub fn is_consistent(&self) -> bool {
        self.tiles
            .iter()
            .all(|tile| tile.is_occupied() || (tile.level == 1 && !tile.damaged))
    }

    fn index(&self, x: usize, y: usize) -> Result<usize, GridError> {
        if x >= self.size || y >= self.size {
            return Err(GridError::OutOfBounds {
                x,
                y,
                size: self.size,
            });
        }
        Ok(y * self.size + x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_grid_is_empty_and_row_major() {
        let grid = Grid::new(15);
        assert_eq!(grid.tiles().count(), 225);
        assert_eq!(grid.occupied_count(), 0);
        let third = grid.tiles().nth(16).unwrap();
        assert_eq!((third.x, third.y), (1, 1));
        assert!(grid.is_consistent());
    }

    #[test]
    fn out_of_bounds_is_reported() {
        let mut grid = Grid::new(15);
        assert_eq!(
            grid.get(15, 0),
            Err(GridError::OutOfBounds {
                x: 15,
                y: 0,
                size: 15
            })
        );
        assert!(grid.set(0, 99, TilePatch::cleared()).is_err());
    }

    #[test]
    fn patch_merges_and_preserves_coordinates() {
        let mut grid = Grid::new(4);
        grid.set(2, 3, TilePatch::building(BuildingKind::Commercial))
            .unwrap();
        grid.set(2, 3, TilePatch::level(3)).unwrap();
        grid.set(2, 3, TilePatch::damaged(true)).unwrap();
        let tile = grid.get(2, 3).unwrap();
        assert_eq!((tile.x, tile.y), (2, 3));
        assert_eq!(tile.kind, BuildingKind::Commercial);
        assert_eq!(tile.level, 3);
        assert!(tile.damaged);
    }

    #[test]
    fn clearing_resets_level_and_damage() {
        let mut grid = Grid::new(4);
        grid.set(1, 1, TilePatch::building(BuildingKind::Park)).unwrap();
        grid.set(1, 1, TilePatch::level(4)).unwrap();
        grid.set(1, 1, TilePatch::damaged(true)).unwrap();
        grid.set(1, 1, TilePatch::cleared()).unwrap();
        assert_eq!(grid.get(1, 1).unwrap(), &Tile::empty(1, 1));

        // Patching an empty tile's level or damage cannot break the invariant.
        grid.set(1, 1, TilePatch::damaged(true)).unwrap();
        grid.set(1, 1, TilePatch::level(7)).unwrap();
        assert!(grid.is_consistent());
    }

    #[test]
    fn neighborhood_is_clipped_at_edges() {
        let grid = Grid::new(15);
        assert_eq!(grid.neighborhood(7, 7).len(), 9);
        assert_eq!(grid.neighborhood(0, 0).len(), 4);
        assert_eq!(grid.neighborhood(14, 7).len(), 6);
    }
}
