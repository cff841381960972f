use serde::{Deserialize, Serialize};

/// One text substitution consumed by the presentation editor's batch
/// replace primitive.
///
/// `scope_slide_ids: None` means "replace everywhere in the presentation";
/// the generation loop scopes each operation to the freshly created slide,
/// while the resync differ emits unscoped operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplacementOperation {
    pub match_text: String,
    pub replace_text: String,
    pub case_sensitive: bool,
    pub scope_slide_ids: Option<Vec<String>>,
}
