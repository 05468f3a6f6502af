use crate::{
    ast::Program,
    position::{Position, SourceId},
};
use std::{fs, io, path::PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum SyntaxError {
    #[error("Could not read the syntax tree of {source_id} from {path}")]
    NotReadable {
        source_id: SourceId,
        path: PathBuf,
        #[source]
        error: io::Error,
    },

    #[error("The syntax tree of {source_id} is not a supported ESTree document: {error}")]
    Malformed {
        source_id: SourceId,
        #[source]
        error: serde_json::Error,
    },
}

/// Supplies the syntax tree of a script.
///
/// The tree's `loc` positions must refer to the given script text.
pub trait SyntaxTreeProvider {
    fn provide(&self, source_id: &SourceId, text: &str) -> Result<Program, SyntaxError>;
}

/// Reads an ESTree JSON document (with `loc` information) from a file.
#[derive(Clone, Debug)]
pub struct EstreeJsonProvider {
    path: PathBuf,
}
impl EstreeJsonProvider {
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self { path }
    }
    /// `main.js` → `main.json`
    #[must_use]
    pub fn next_to_script(script_path: impl Into<PathBuf>) -> Self {
        let mut path = script_path.into();
        path.set_extension("json");
        Self { path }
    }

    #[must_use]
    pub const fn path(&self) -> &PathBuf {
        &self.path
    }

    pub fn parse(source_id: &SourceId, json: &str) -> Result<Program, SyntaxError> {
        serde_json::from_str(json).map_err(|error| SyntaxError::Malformed {
            source_id: source_id.clone(),
            error,
        })
    }
}
impl SyntaxTreeProvider for EstreeJsonProvider {
    fn provide(&self, source_id: &SourceId, text: &str) -> Result<Program, SyntaxError> {
        debug!(
            "Reading the syntax tree of {source_id} from {}.",
            self.path.display(),
        );
        let json = fs::read_to_string(&self.path).map_err(|error| SyntaxError::NotReadable {
            source_id: source_id.clone(),
            path: self.path.clone(),
            error,
        })?;
        let program = Self::parse(source_id, &json)?;

        let last_line = text.lines().count().max(1);
        if program.loc.end > Position::new(last_line + 1, 0) {
            warn!(
                "The syntax tree of {source_id} ends at {}, but the script only has {last_line} lines. Is it outdated?",
                program.loc.end,
            );
        }
        Ok(program)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_path_maps_to_json_path() {
        let provider = EstreeJsonProvider::next_to_script("scripts/main.js");
        assert_eq!(provider.path(), &PathBuf::from("scripts/main.json"));
    }

    #[test]
    fn malformed_document_is_reported() {
        let error = EstreeJsonProvider::parse(&"main.js".into(), "{ \"type\": \"Program\" }")
            .unwrap_err();
        assert!(matches!(error, SyntaxError::Malformed { .. }));
        assert!(error.to_string().starts_with("The syntax tree of main.js"));
    }

    #[test]
    fn missing_file_is_reported() {
        let provider = EstreeJsonProvider::new(PathBuf::from("/does/not/exist.json"));
        let error = provider.provide(&"main.js".into(), "").unwrap_err();
        assert!(matches!(error, SyntaxError::NotReadable { .. }));
    }
}
