//! Collaborators and file formats used around fixture setup.

pub mod config;
pub mod control_plane;
pub mod fixture_file;
pub mod memory_db;
