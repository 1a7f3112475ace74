//! Image asset handling
//!
//! This module handles:
//! - Per-folder durable directories
//! - Decoding embedded data: URIs into scratch files
//! - Copying captures into their folder without overwriting earlier files

pub mod embedded;
pub mod files;
