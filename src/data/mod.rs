mod dataset;
mod load;

pub use dataset::{GraphDataset, GraphOptions};
pub use load::{demo_dataset, load_graph_dataset};
