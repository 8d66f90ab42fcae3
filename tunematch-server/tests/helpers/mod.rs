//! Test Helper Utilities
//!
//! Shared utilities for testing tunematch-server
#![allow(dead_code)]

pub mod audio_generator;
pub mod db_utils;
pub mod fakes;
pub mod log_capture;

pub use audio_generator::{write_burst_wav, write_sine_wav, AudioConfig};
pub use db_utils::{
    basis, comparison_count, insert_json_song, insert_text_song, memory_catalog, memory_pool,
};
pub use fakes::{shared, BrokenCatalog, FakeExtractor, FakeSource};
pub use log_capture::{LogCapture, LogRecord};
