use crate::error::ProgramError;
use scriptdbg_syntax::{ast::Program, EstreeJsonProvider, SourceId, SyntaxTreeProvider};
use std::{fs, path::Path, sync::Arc};
use tracing::info;

/// A script's text together with its syntax tree.
#[derive(Clone, Debug)]
pub struct LoadedScript {
    pub source_id: SourceId,
    pub text: String,
    pub program: Arc<Program>,
}
impl LoadedScript {
    #[must_use]
    pub fn new(source_id: SourceId, text: impl Into<String>, program: Program) -> Self {
        Self {
            source_id,
            text: text.into(),
            program: Arc::new(program),
        }
    }

    /// Reads the script at `path` and gets its tree from `provider`. The
    /// path doubles as the source ID.
    pub fn load(path: &Path, provider: &dyn SyntaxTreeProvider) -> Result<Self, ProgramError> {
        let text = fs::read_to_string(path).map_err(|error| ProgramError::ScriptNotReadable {
            path: path.to_path_buf(),
            error,
        })?;
        let source_id = SourceId::from(path.display().to_string());
        let program = provider.provide(&source_id, &text)?;
        info!(
            "Loaded {source_id} with {} top-level statements.",
            program.body.len(),
        );
        Ok(Self::new(source_id, text, program))
    }

    /// Uses the ESTree JSON document at `ast_path`, or the one next to the
    /// script.
    pub fn load_with_estree_json(
        path: &Path,
        ast_path: Option<&Path>,
    ) -> Result<Self, ProgramError> {
        let provider = ast_path.map_or_else(
            || EstreeJsonProvider::next_to_script(path),
            |ast_path| EstreeJsonProvider::new(ast_path.to_path_buf()),
        );
        Self::load(path, &provider)
    }
}
