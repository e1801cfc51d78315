pub mod dedup;
pub mod orchestrator;
pub mod relevance;
