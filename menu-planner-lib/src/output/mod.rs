mod artifact_writer;

pub use artifact_writer::*;
