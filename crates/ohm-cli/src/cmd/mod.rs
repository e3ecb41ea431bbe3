pub mod calculate;
pub mod completions;
pub mod graph;
pub mod load;
pub mod report;
pub mod save;
pub mod upload;
