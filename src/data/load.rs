use std::path::Path;

use anyhow::{Context, Result};

use super::{GraphDataset, GraphOptions};

pub fn load_graph_dataset(path: &Path) -> Result<GraphDataset> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read graph payload {}", path.display()))?;

    let mut dataset: GraphDataset = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse graph payload {}", path.display()))?;

    dataset
        .validate()
        .with_context(|| format!("invalid graph payload {}", path.display()))?;
    dataset.normalize_radii();

    Ok(dataset)
}

/// Small built-in site so the binary runs without an exported payload.
pub fn demo_dataset() -> GraphDataset {
    let docs: &[(&str, &[usize])] = &[
        ("Home", &[1, 2, 3, 8]),
        ("Getting Started", &[2, 4, 5]),
        ("Concepts", &[4, 5, 6]),
        ("Changelog", &[]),
        ("Configuration", &[5, 7]),
        ("Themes", &[7]),
        ("Publishing", &[4, 7, 9]),
        ("FAQ", &[]),
        ("About", &[9]),
        ("Contact", &[]),
        ("Plugins", &[2, 4, 12]),
        ("Shortcuts", &[1]),
        ("API", &[13, 14]),
        ("API: Nodes", &[14]),
        ("API: Links", &[]),
        ("Roadmap", &[0, 3]),
    ];

    let node_count = docs.len();
    let mut link_sources = Vec::new();
    let mut link_targets = Vec::new();
    let mut degree = vec![0usize; node_count];

    for (source, (_label, targets)) in docs.iter().enumerate() {
        for &target in targets.iter() {
            link_sources.push(source as i32);
            link_targets.push(target as i32);
            degree[source] += 1;
            degree[target] += 1;
        }
    }

    let options = GraphOptions::default();
    let max_degree = degree.iter().copied().max().unwrap_or(1).max(1) as f32;
    let radii = degree
        .iter()
        .map(|&count| {
            options.min_node_radius
                + (count as f32 / max_degree)
                    * (options.max_node_radius - options.min_node_radius)
        })
        .collect();

    let labels = docs.iter().map(|(label, _)| (*label).to_owned()).collect();
    let paths = docs
        .iter()
        .map(|(label, _)| {
            let slug = label
                .to_ascii_lowercase()
                .replace(':', "")
                .replace(' ', "-");
            format!("{slug}.html")
        })
        .collect();

    GraphDataset {
        node_count,
        link_count: link_sources.len(),
        radii,
        labels,
        paths,
        link_sources,
        link_targets,
        options,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_dataset_is_valid() {
        let dataset = demo_dataset();
        assert!(dataset.validate().is_ok());
        assert!(dataset.node_count > 0);
        assert_eq!(dataset.link_count, dataset.link_sources.len());
    }

    #[test]
    fn load_rejects_missing_file() {
        assert!(load_graph_dataset(Path::new("/nonexistent/graph.json")).is_err());
    }
}
