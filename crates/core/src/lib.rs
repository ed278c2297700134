pub mod aggregation;
pub mod classification;
pub mod detection;
pub mod ingestion;
pub mod pipeline;
pub mod session;
pub mod shared;
