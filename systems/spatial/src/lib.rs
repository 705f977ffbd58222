#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Uniform-cell spatial hash index over agent positions.
//!
//! The grid is rebuilt from scratch at the start of every tactical tick and
//! is stale in between; it is never updated incrementally. Queries return
//! the 3×3 block of cells around a point, which is a superset of any fixed
//! physical radius up to one cell width.

use std::collections::HashMap;

use glam::Vec3;
use horde_core::{AgentId, AgentView};

/// Position and velocity captured for one agent at rebuild time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridEntry {
    /// Identifier of the indexed agent.
    pub agent: AgentId,
    /// Position captured when the grid was rebuilt.
    pub position: Vec3,
    /// Velocity captured when the grid was rebuilt.
    pub velocity: Vec3,
}

/// Hash index mapping integer cell coordinates to agent buckets.
#[derive(Debug)]
pub struct SpatialGrid {
    cell_size: f32,
    cells: HashMap<(i32, i32), Vec<GridEntry>>,
}

impl SpatialGrid {
    /// Creates an empty grid with the provided cell edge length.
    ///
    /// Non-positive sizes fall back to one world unit so the index stays
    /// usable rather than dividing by zero.
    #[must_use]
    pub fn new(cell_size: f32) -> Self {
        let cell_size = if cell_size > 0.0 { cell_size } else { 1.0 };
        Self {
            cell_size,
            cells: HashMap::new(),
        }
    }

    /// Edge length of a grid cell in world units.
    #[must_use]
    pub const fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Integer cell coordinate containing the provided position.
    #[must_use]
    pub fn cell_of(&self, position: Vec3) -> (i32, i32) {
        (
            (position.x / self.cell_size).floor() as i32,
            (position.y / self.cell_size).floor() as i32,
        )
    }

    /// Clears the index and reinserts every agent captured by the view.
    ///
    /// Agents removed from the population before the rebuild are absent by
    /// construction, since the view only captures live agents.
    pub fn rebuild(&mut self, agents: &AgentView) {
        for bucket in self.cells.values_mut() {
            bucket.clear();
        }

        for snapshot in agents.iter() {
            let cell = self.cell_of(snapshot.position);
            self.cells.entry(cell).or_default().push(GridEntry {
                agent: snapshot.id,
                position: snapshot.position,
                velocity: snapshot.velocity,
            });
        }
    }

    /// Iterates over every agent in the 3×3 block of cells centered on the
    /// cell containing `position`. No ordering is guaranteed within a cell.
    pub fn neighborhood(&self, position: Vec3) -> impl Iterator<Item = &GridEntry> {
        let (column, row) = self.cell_of(position);
        NEIGHBOR_OFFSETS.iter().flat_map(move |(dx, dy)| {
            self.cells
                .get(&(column.wrapping_add(*dx), row.wrapping_add(*dy)))
                .map(Vec::as_slice)
                .unwrap_or_default()
                .iter()
        })
    }

    /// Total number of agents currently indexed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.values().map(Vec::len).sum()
    }

    /// Reports whether the index currently holds no agents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

const NEIGHBOR_OFFSETS: [(i32, i32); 9] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 0),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

#[cfg(test)]
mod tests {
    use super::*;
    use horde_core::{AgentSnapshot, AggressionState};

    fn snapshot(id: u32, x: f32, y: f32) -> AgentSnapshot {
        AgentSnapshot {
            id: AgentId::new(id),
            position: Vec3::new(x, y, 0.0),
            velocity: Vec3::ZERO,
            speed: 2.0,
            speed_multiplier: 1.0,
            aggression: AggressionState::Alert,
            lane: None,
            tactical_target: None,
            angle_noise: 0.0,
        }
    }

    fn neighbors_of(grid: &SpatialGrid, x: f32, y: f32) -> Vec<u32> {
        let mut ids: Vec<u32> = grid
            .neighborhood(Vec3::new(x, y, 0.0))
            .map(|entry| entry.agent.get())
            .collect();
        ids.sort_unstable();
        ids
    }

    #[test]
    fn neighborhood_returns_exactly_the_three_by_three_block() {
        let mut grid = SpatialGrid::new(4.0);
        let view = AgentView::from_snapshots(vec![
            snapshot(0, 0.5, 0.5),   // cell (0, 0)
            snapshot(1, 5.0, 0.5),   // cell (1, 0)
            snapshot(2, -0.5, -0.5), // cell (-1, -1)
            snapshot(3, 9.0, 0.5),   // cell (2, 0), outside the block
            snapshot(4, 0.5, 9.0),   // cell (0, 2), outside the block
        ]);
        grid.rebuild(&view);

        assert_eq!(neighbors_of(&grid, 0.5, 0.5), vec![0, 1, 2]);
    }

    #[test]
    fn neighborhood_spans_negative_cells() {
        let mut grid = SpatialGrid::new(2.0);
        let view = AgentView::from_snapshots(vec![
            snapshot(0, -1.0, -1.0), // cell (-1, -1)
            snapshot(1, -3.0, -3.0), // cell (-2, -2)
            snapshot(2, -5.0, -5.0), // cell (-3, -3), outside the block
        ]);
        grid.rebuild(&view);

        assert_eq!(neighbors_of(&grid, -1.0, -1.0), vec![0, 1]);
    }

    #[test]
    fn rebuild_discards_previous_contents() {
        let mut grid = SpatialGrid::new(4.0);
        grid.rebuild(&AgentView::from_snapshots(vec![snapshot(0, 0.5, 0.5)]));
        assert_eq!(grid.len(), 1);

        grid.rebuild(&AgentView::from_snapshots(vec![snapshot(7, 0.6, 0.6)]));
        assert_eq!(grid.len(), 1);
        assert_eq!(neighbors_of(&grid, 0.5, 0.5), vec![7]);
    }

    #[test]
    fn rebuild_handles_empty_views() {
        let mut grid = SpatialGrid::new(4.0);
        grid.rebuild(&AgentView::from_snapshots(vec![snapshot(0, 0.5, 0.5)]));
        grid.rebuild(&AgentView::default());
        assert!(grid.is_empty());
        assert!(neighbors_of(&grid, 0.5, 0.5).is_empty());
    }

    #[test]
    fn degenerate_cell_size_falls_back_to_unit_cells() {
        let grid = SpatialGrid::new(0.0);
        assert_eq!(grid.cell_size(), 1.0);
        assert_eq!(grid.cell_of(Vec3::new(2.5, -0.5, 0.0)), (2, -1));
    }
}
