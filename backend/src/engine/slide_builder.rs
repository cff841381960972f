//! Collaborator seams consumed by the engine.
//!
//! The engine never constructs its collaborators: it receives them as trait
//! objects, so the whole loop can be driven in tests by fakes with zero
//! network dependencies. The concrete Google implementations live in
//! `crate::google`.

use crate::engine::error::SlideError;
use common::model::replacement::ReplacementOperation;

/// The presentation-editing capability: duplicate, stamp, delete.
pub trait SlideBuilder {
    /// Current number of slides in the presentation. Used to seed the
    /// insertion index so generated slides append after existing content.
    fn slide_count(&self, presentation_id: &str) -> Result<usize, SlideError>;

    /// The id of the presentation's first slide — the fallback template when
    /// a job does not pin one explicitly.
    fn first_slide_id(&self, presentation_id: &str) -> Result<String, SlideError>;

    /// Duplicates `template_slide_id` into position `insertion_index` and
    /// returns the new slide's id.
    fn duplicate_slide(
        &self,
        presentation_id: &str,
        template_slide_id: &str,
        insertion_index: usize,
    ) -> Result<String, SlideError>;

    /// Batch text substitution. Each operation carries its own optional
    /// slide scope.
    fn apply_replacements(
        &self,
        presentation_id: &str,
        operations: &[ReplacementOperation],
    ) -> Result<(), SlideError>;

    fn delete_slide(&self, presentation_id: &str, slide_id: &str) -> Result<(), SlideError>;
}

/// Read-only view of a presentation's text content, consumed by the resync
/// differ.
pub trait PresentationReader {
    fn snapshot(&self, presentation_id: &str) -> Result<PresentationSnapshot, SlideError>;
}

/// Flattened text content of a presentation: per slide, every text run from
/// shapes and table cells, in document order.
#[derive(Debug, Clone, Default)]
pub struct PresentationSnapshot {
    pub slides: Vec<SlideSnapshot>,
}

#[derive(Debug, Clone)]
pub struct SlideSnapshot {
    pub slide_id: String,
    pub texts: Vec<String>,
}

impl PresentationSnapshot {
    pub fn slide_count(&self) -> usize {
        self.slides.len()
    }

    /// Whether `needle` appears as a substring anywhere in the presentation.
    pub fn contains(&self, needle: &str) -> bool {
        self.slides
            .iter()
            .flat_map(|s| s.texts.iter())
            .any(|t| t.contains(needle))
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.slides
            .iter()
            .flat_map(|s| s.texts.iter().map(String::as_str))
    }
}

/// Reads the source dataset. A failure here aborts job creation; no job or
/// items are persisted for an unreadable sheet.
pub trait SpreadsheetReader {
    fn read_grid(&self, spreadsheet_id: &str, range: &str) -> Result<Vec<Vec<String>>, String>;
}

/// One-way completion notification toward the owning project record.
/// Failures are logged and never fail the job.
pub trait ProjectNotifier {
    fn presentation_generated(
        &self,
        project_id: &str,
        presentation_id: &str,
        first_slide_id: Option<&str>,
    ) -> Result<(), String>;
}

/// Progress sink for status polling. The HTTP layer bridges this onto the
/// job controller's mpsc channel; tests usually leave it unset.
pub trait JobProgress {
    fn on_item(&self, processed: usize, errored: usize, total: usize);
}
