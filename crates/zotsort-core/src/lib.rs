//! zotsort core library
//!
//! Collection path resolution, batch classification and keyword clustering
//! for a Zotero library.

pub mod cache;
pub mod classify;
pub mod config;
pub mod error;
pub mod format;
pub mod keywords;
pub mod logging;
pub mod organizer;
pub mod remote;
pub mod resolver;
