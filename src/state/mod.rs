//! State management module
//!
//! This module handles all catalog state, including:
//! - Key-value storage backends (store.rs)
//! - Folder and image records (data.rs)
//! - The folder repository (library.rs)
//! - The capture screen state machine (session.rs)
//! - Raw local data browsing helpers (inspect.rs)

pub mod data;
pub mod inspect;
pub mod library;
pub mod session;
pub mod store;
