//! Save/Load of layouts as JSON.
//!
//! The file mirrors [`LayoutState`] directly: `crewSize`, `mainModules`,
//! `subModules`, `connections`, with catalogue fields spread into each
//! placed record. There is no version field; anything that parses is
//! accepted and left to the validator.

use crate::layout::LayoutState;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during save/load.
#[derive(Debug, Error)]
pub enum LayoutFileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid layout JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn to_json_string(state: &LayoutState) -> Result<String, LayoutFileError> {
    Ok(serde_json::to_string_pretty(state)?)
}

pub fn from_json_str(json: &str) -> Result<LayoutState, LayoutFileError> {
    Ok(serde_json::from_str(json)?)
}

/// Write a layout to any writer as pretty JSON.
pub fn save_layout<W: Write>(writer: W, state: &LayoutState) -> Result<(), LayoutFileError> {
    serde_json::to_writer_pretty(writer, state)?;
    log::info!(
        "Saved layout: {} modules, {} sub-modules, {} connections",
        state.main_modules.len(),
        state.sub_modules.len(),
        state.connections.len()
    );
    Ok(())
}

/// Read a layout from any reader.
pub fn load_layout<R: Read>(reader: R) -> Result<LayoutState, LayoutFileError> {
    let state: LayoutState = serde_json::from_reader(reader)?;
    log::info!(
        "Loaded layout: {} modules, {} sub-modules, {} connections",
        state.main_modules.len(),
        state.sub_modules.len(),
        state.connections.len()
    );
    Ok(state)
}

pub fn save_to_path(path: impl AsRef<Path>, state: &LayoutState) -> Result<(), LayoutFileError> {
    let mut writer = BufWriter::new(File::create(path)?);
    save_layout(&mut writer, state)?;
    writer.flush()?;
    Ok(())
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<LayoutState, LayoutFileError> {
    load_layout(BufReader::new(File::open(path)?))
}
