use std::fs;
use std::io;
use std::path::PathBuf;

/// Durable holder of the one message id being maintained in the destination
/// chat. A plain decimal in a plain file; absent or unreadable means "no
/// message currently tracked", which is how a fresh deployment starts anyway.
pub struct MessageStateStore {
    path: PathBuf,
}

impl MessageStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read the tracked message id. Corruption is treated the same as "never
    /// published": the publisher recovers by sending a fresh message.
    pub fn load(&self) -> Option<i64> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("no state file at {}", self.path.display());
                return None;
            }
            Err(e) => {
                tracing::warn!("failed to read {}: {e}", self.path.display());
                return None;
            }
        };

        match raw.trim().parse() {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!("unparseable message id in {}: {e}", self.path.display());
                None
            }
        }
    }

    /// Overwrite the tracked message id, last write wins. The publish already
    /// happened by the time this runs, so a write failure is logged and
    /// swallowed rather than failing the tick.
    pub fn store(&self, message_id: i64) {
        if let Err(e) = self.write_atomic(message_id) {
            tracing::warn!(
                "failed to persist message id {message_id} to {}: {e}",
                self.path.display()
            );
        }
    }

    // Temp-then-rename so a crash mid-write can't leave a half-written id.
    fn write_atomic(&self, message_id: i64) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, message_id.to_string())?;
        fs::rename(&tmp, &self.path)
    }
}
