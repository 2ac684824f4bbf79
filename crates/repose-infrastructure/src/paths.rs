//! Unified path management for repose data files.
//!
//! All repositories store their documents under one base directory:
//!
//! ```text
//! <data_dir>/repose/
//! ├── checkpoints/<user_id>/<practice_id>.json
//! ├── history/<user_id>/<record_id>.json
//! └── stats/<user_id>.json
//! ```

use repose_core::error::{ReposeError, Result};
use std::path::PathBuf;

/// Path resolution for the on-disk document store.
pub struct ReposePaths;

impl ReposePaths {
    /// Returns the platform data directory for repose
    /// (e.g., `~/.local/share/repose` on Linux).
    ///
    /// # Errors
    ///
    /// Returns an error if no data directory can be determined for the
    /// platform.
    pub fn data_dir() -> Result<PathBuf> {
        dirs::data_dir()
            .or_else(dirs::home_dir)
            .map(|base| base.join("repose"))
            .ok_or_else(|| ReposeError::io("cannot determine a data directory"))
    }
}
