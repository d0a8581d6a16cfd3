use eframe::egui::Vec2;
use rustc_hash::FxHashMap;

/// Uniform spatial hash over node positions, rebuilt once per step. Near
/// queries walk the cells overlapping a circle and yield exact indices; far
/// queries collapse every remaining cell to its centroid and occupant count.
pub(super) struct SpatialGrid {
    cell_size: f32,
    cells: FxHashMap<(i32, i32), Cell>,
}

#[derive(Default)]
struct Cell {
    indices: Vec<usize>,
    sum: Vec2,
}

impl Cell {
    fn centroid(&self) -> Vec2 {
        self.sum / self.indices.len().max(1) as f32
    }
}

impl SpatialGrid {
    pub(super) fn new(cell_size: f32) -> Self {
        Self {
            cell_size: cell_size.max(1.0),
            cells: FxHashMap::default(),
        }
    }

    pub(super) fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub(super) fn rebuild(&mut self, positions: &[Vec2]) {
        self.cells.clear();
        for (index, position) in positions.iter().enumerate() {
            let cell = self.cells.entry(self.key_for(*position)).or_default();
            cell.indices.push(index);
            cell.sum += *position;
        }
    }

    fn key_for(&self, position: Vec2) -> (i32, i32) {
        (
            (position.x / self.cell_size).floor() as i32,
            (position.y / self.cell_size).floor() as i32,
        )
    }

    fn key_range(&self, position: Vec2, radius: f32) -> (i32, i32, i32, i32) {
        let reach = radius + self.cell_size * 0.5;
        let left = ((position.x - reach) / self.cell_size).floor() as i32;
        let right = ((position.x + reach) / self.cell_size).floor() as i32;
        let top = ((position.y - reach) / self.cell_size).floor() as i32;
        let bottom = ((position.y + reach) / self.cell_size).floor() as i32;
        (left, right, top, bottom)
    }

    /// Visits every node index stored in cells overlapping the query circle.
    pub(super) fn for_each_near(&self, position: Vec2, radius: f32, mut visit: impl FnMut(usize)) {
        let (left, right, top, bottom) = self.key_range(position, radius);
        for x in left..=right {
            for y in top..=bottom {
                if let Some(cell) = self.cells.get(&(x, y)) {
                    for &index in &cell.indices {
                        visit(index);
                    }
                }
            }
        }
    }

    /// Visits every cell outside the query circle's range as an aggregate of
    /// (centroid, occupant count). Together with `for_each_near` this covers
    /// each node exactly once.
    pub(super) fn for_each_far_cell(
        &self,
        position: Vec2,
        radius: f32,
        mut visit: impl FnMut(Vec2, f32),
    ) {
        let (left, right, top, bottom) = self.key_range(position, radius);
        for (&(x, y), cell) in &self.cells {
            if x >= left && x <= right && y >= top && y <= bottom {
                continue;
            }
            visit(cell.centroid(), cell.indices.len() as f32);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eframe::egui::vec2;

    fn scattered_positions() -> Vec<Vec2> {
        (0..40)
            .map(|index| {
                let angle = index as f32 * 0.7;
                vec2(angle.cos() * (index as f32 * 9.0), angle.sin() * 260.0)
            })
            .collect()
    }

    #[test]
    fn near_and_far_cover_every_node_once() {
        let positions = scattered_positions();
        let mut grid = SpatialGrid::new(48.0);
        grid.rebuild(&positions);

        let query = positions[7];
        let mut near = 0usize;
        let mut far = 0.0_f32;
        grid.for_each_near(query, 96.0, |_index| near += 1);
        grid.for_each_far_cell(query, 96.0, |_centroid, count| far += count);

        assert_eq!(near + far as usize, positions.len());
    }

    #[test]
    fn near_query_finds_adjacent_nodes() {
        let positions = vec![vec2(0.0, 0.0), vec2(10.0, 0.0), vec2(500.0, 500.0)];
        let mut grid = SpatialGrid::new(32.0);
        grid.rebuild(&positions);

        let mut seen = Vec::new();
        grid.for_each_near(vec2(1.0, 1.0), 16.0, |index| seen.push(index));
        seen.sort_unstable();

        assert!(seen.contains(&0));
        assert!(seen.contains(&1));
        assert!(!seen.contains(&2));
    }

    #[test]
    fn far_cells_report_centroids() {
        let positions = vec![vec2(400.0, 400.0), vec2(404.0, 404.0), vec2(0.0, 0.0)];
        let mut grid = SpatialGrid::new(32.0);
        grid.rebuild(&positions);

        let mut aggregates = Vec::new();
        grid.for_each_far_cell(vec2(0.0, 0.0), 32.0, |centroid, count| {
            aggregates.push((centroid, count));
        });

        assert_eq!(aggregates.len(), 1);
        let (centroid, count) = aggregates[0];
        assert_eq!(count, 2.0);
        assert!((centroid.x - 402.0).abs() < 0.01);
        assert!((centroid.y - 402.0).abs() < 0.01);
    }
}
