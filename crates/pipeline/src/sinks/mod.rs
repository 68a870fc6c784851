//! Artifact sinks

mod artifact;

pub use artifact::ArtifactWriter;
