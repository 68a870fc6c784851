//! Pipeline assembly - the composition root of a run.

mod assembly;
mod summary;

pub use assembly::build_pipeline;
pub use summary::print_summary;
