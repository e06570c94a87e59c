//! The compiled logic program and its on-disk artifacts.
//!
//! A program is persisted as two files in an artifacts directory:
//! `world.pl` (world rules and observed facts) and `preference.pl`
//! (derived preference rules). Evaluation always sees world followed by
//! preferences.

use crate::error::{Result, RuleError};
use inference::Program;
use std::fs;
use std::path::Path;
use tracing::info;

/// File holding world rules, preference facts and movie facts
pub const WORLD_FILE: &str = "world.pl";

/// File holding derived preference rules
pub const PREFERENCE_FILE: &str = "preference.pl";

/// Immutable program text, shared read-only by every worker
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LogicProgram {
    pub world: String,
    pub preferences: String,
}

impl LogicProgram {
    pub fn new(world: String, preferences: String) -> Self {
        Self { world, preferences }
    }

    /// Full program text: world section, then preference section
    pub fn text(&self) -> String {
        let mut text = String::with_capacity(self.world.len() + self.preferences.len());
        text.push_str(&self.world);
        text.push_str(&self.preferences);
        text
    }

    /// Persist both sections under `dir`, creating it if needed
    pub fn write_to(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir).map_err(|source| RuleError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        for (name, contents) in [(WORLD_FILE, &self.world), (PREFERENCE_FILE, &self.preferences)] {
            let path = dir.join(name);
            fs::write(&path, contents).map_err(|source| RuleError::Io { path, source })?;
        }

        info!(
            "Wrote {} ({} bytes) and {} ({} bytes) to {}",
            WORLD_FILE,
            self.world.len(),
            PREFERENCE_FILE,
            self.preferences.len(),
            dir.display()
        );
        Ok(())
    }

    /// Read both sections back from `dir`, checking that each one parses
    pub fn load_from(dir: &Path) -> Result<Self> {
        let read = |name: &str| -> Result<String> {
            let path = dir.join(name);
            let text = fs::read_to_string(&path).map_err(|source| RuleError::Io {
                path: path.clone(),
                source,
            })?;
            Program::parse(&text).map_err(|source| RuleError::InvalidProgram { path, source })?;
            Ok(text)
        };

        Ok(Self {
            world: read(WORLD_FILE)?,
            preferences: read(PREFERENCE_FILE)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("rules-program-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_text_concatenates_world_then_preferences() {
        let program = LogicProgram::new(
            "prefers(user1, comedy).\n".to_string(),
            "0.50::prefers(U, romance) :- prefers(U, comedy).\n".to_string(),
        );
        assert_eq!(
            program.text(),
            "prefers(user1, comedy).\n0.50::prefers(U, romance) :- prefers(U, comedy).\n"
        );
    }

    #[test]
    fn test_write_and_load() {
        let dir = temp_dir("write-load");
        let program = LogicProgram::new(
            "has_genre(movie1, comedy).\n".to_string(),
            "0.50::prefers(U, romance) :- prefers(U, comedy).\n".to_string(),
        );

        program.write_to(&dir).unwrap();
        assert!(dir.join(WORLD_FILE).exists());
        assert!(dir.join(PREFERENCE_FILE).exists());
        assert_eq!(LogicProgram::load_from(&dir).unwrap(), program);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_load_missing_artifact() {
        let dir = temp_dir("missing");
        let err = LogicProgram::load_from(&dir).unwrap_err();
        assert!(matches!(err, RuleError::Io { .. }));
    }

    #[test]
    fn test_load_rejects_malformed_program() {
        let dir = temp_dir("malformed");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(WORLD_FILE), "2.5::prefers(user1, comedy).\n").unwrap();
        fs::write(dir.join(PREFERENCE_FILE), "").unwrap();

        let err = LogicProgram::load_from(&dir).unwrap_err();
        assert!(matches!(err, RuleError::InvalidProgram { .. }));

        fs::remove_dir_all(&dir).unwrap();
    }
}
