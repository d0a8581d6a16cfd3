use anyhow::{Result, ensure};
use serde::Deserialize;

/// Layout tunables shipped alongside the node data by the export pipeline.
/// All forces are non-negative; `edge_pruning` is a 0..1 threshold below
/// which an edge's spring influence may be skipped.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GraphOptions {
    pub attraction_force: f32,
    pub link_length: f32,
    pub repulsion_force: f32,
    pub central_force: f32,
    pub edge_pruning: f32,
    pub min_node_radius: f32,
    pub max_node_radius: f32,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            attraction_force: 8.0,
            link_length: 60.0,
            repulsion_force: 80.0,
            central_force: 2.0,
            edge_pruning: 0.0,
            min_node_radius: 3.0,
            max_node_radius: 10.0,
        }
    }
}

/// Immutable graph payload produced by the export pipeline: one entry per
/// document plus the link topology between them. Built once, validated once,
/// then treated as read-only by the whole view.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphDataset {
    pub node_count: usize,
    pub link_count: usize,
    pub radii: Vec<f32>,
    pub labels: Vec<String>,
    pub paths: Vec<String>,
    pub link_sources: Vec<i32>,
    pub link_targets: Vec<i32>,
    #[serde(default)]
    pub options: GraphOptions,
}

impl GraphDataset {
    /// Fatal precondition checks. A dataset that fails here must never reach
    /// the simulation kernel; the caller refuses to start the view instead.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.radii.len() == self.node_count,
            "radii length {} does not match node count {}",
            self.radii.len(),
            self.node_count
        );
        ensure!(
            self.labels.len() == self.node_count,
            "labels length {} does not match node count {}",
            self.labels.len(),
            self.node_count
        );
        ensure!(
            self.paths.len() == self.node_count,
            "paths length {} does not match node count {}",
            self.paths.len(),
            self.node_count
        );
        ensure!(
            self.link_sources.len() == self.link_count,
            "link sources length {} does not match link count {}",
            self.link_sources.len(),
            self.link_count
        );
        ensure!(
            self.link_targets.len() == self.link_count,
            "link targets length {} does not match link count {}",
            self.link_targets.len(),
            self.link_count
        );

        for (index, radius) in self.radii.iter().enumerate() {
            ensure!(
                radius.is_finite() && *radius > 0.0,
                "radius {radius} at index {index} is not a positive finite value"
            );
        }

        for (index, &source) in self.link_sources.iter().enumerate() {
            ensure!(
                source >= 0 && (source as usize) < self.node_count,
                "link source {source} at index {index} is outside [0, {})",
                self.node_count
            );
        }
        for (index, &target) in self.link_targets.iter().enumerate() {
            ensure!(
                target >= 0 && (target as usize) < self.node_count,
                "link target {target} at index {index} is outside [0, {})",
                self.node_count
            );
        }

        ensure!(
            self.options.attraction_force >= 0.0
                && self.options.repulsion_force >= 0.0
                && self.options.central_force >= 0.0
                && self.options.link_length >= 0.0,
            "force tunables must be non-negative"
        );
        ensure!(
            (0.0..=1.0).contains(&self.options.edge_pruning),
            "edge pruning {} is outside [0, 1]",
            self.options.edge_pruning
        );

        Ok(())
    }

    /// Clamps every radius into the payload's configured band. The exporter
    /// already sizes nodes by link degree; this only guards stray values.
    pub fn normalize_radii(&mut self) {
        let min = self.options.min_node_radius.max(0.5);
        let max = self.options.max_node_radius.max(min);
        for radius in &mut self.radii {
            *radius = radius.clamp(min, max);
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_dataset() -> GraphDataset {
        GraphDataset {
            node_count: 3,
            link_count: 2,
            radii: vec![4.0, 6.0, 4.0],
            labels: vec!["a".into(), "b".into(), "c".into()],
            paths: vec!["a.html".into(), "b.html".into(), "c.html".into()],
            link_sources: vec![0, 1],
            link_targets: vec![1, 2],
            options: GraphOptions::default(),
        }
    }

    #[test]
    fn valid_dataset_passes() {
        assert!(small_dataset().validate().is_ok());
    }

    #[test]
    fn out_of_range_link_is_rejected() {
        let mut dataset = small_dataset();
        dataset.link_targets[1] = 3;
        assert!(dataset.validate().is_err());

        let mut dataset = small_dataset();
        dataset.link_sources[0] = -1;
        assert!(dataset.validate().is_err());
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        let mut dataset = small_dataset();
        dataset.radii.pop();
        assert!(dataset.validate().is_err());

        let mut dataset = small_dataset();
        dataset.link_sources.push(0);
        assert!(dataset.validate().is_err());
    }

    #[test]
    fn normalize_radii_clamps_into_configured_band() {
        let mut dataset = small_dataset();
        dataset.radii = vec![0.1, 50.0, 5.0];
        dataset.normalize_radii();
        assert_eq!(dataset.radii[0], dataset.options.min_node_radius);
        assert_eq!(dataset.radii[1], dataset.options.max_node_radius);
        assert_eq!(dataset.radii[2], 5.0);
    }
}
