//! Small shared utilities that don't belong to any one pipeline stage.

pub mod json_ext;
