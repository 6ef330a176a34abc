// src/subgraph/mod.rs
//! Size-bounded breadth-first extraction of the stored relationship graph.

mod extractor;
mod sink;

pub use extractor::{ExtractionReport, ExtractionSettings, SubgraphExtractor};
pub use sink::{DelimitedEdgeWriter, EdgeSink};
