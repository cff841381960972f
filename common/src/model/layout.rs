use crate::model::row::ColumnMapping;
use serde::{Deserialize, Serialize};

/// Visual slot a placeholder is stamped into on the generated slide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayoutSlot {
    Title,
    Subtitle,
    Body,
    Accent,
}

/// One placeholder of a layout together with its intended visual slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutElement {
    pub placeholder: String,
    pub slot: LayoutSlot,
}

/// An ordered set of layout elements, either loaded from the static registry
/// (named by template type) or synthesized from a column mapping. Never
/// mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layout {
    pub name: String,
    pub elements: Vec<LayoutElement>,
}

impl Layout {
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.elements.iter().map(|e| e.placeholder.as_str())
    }
}

/// Where a job's layout comes from. Resolved once at job start, so the
/// per-row loop never re-branches on mapping/template-type presence.
///
/// An explicit mapping always wins over a named template type: supplying a
/// mapping signals user intent to override the defaults.
#[derive(Debug, Clone)]
pub enum LayoutSource {
    Dynamic(ColumnMapping),
    Named(String),
}
