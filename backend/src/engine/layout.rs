//! Resolves which visual layout gets stamped onto the generated slides.
//!
//! Priority: an explicit, non-empty column mapping always wins (the user is
//! overriding defaults), then a registered named layout, and anything else
//! aborts the job before a single row is touched — without a layout no
//! placeholder can be resolved.

use crate::engine::error::EngineError;
use common::model::layout::{Layout, LayoutElement, LayoutSlot, LayoutSource};
use common::model::row::ColumnMapping;
use std::collections::HashMap;

pub struct LayoutResolver {
    registry: HashMap<String, Layout>,
}

impl Default for LayoutResolver {
    fn default() -> Self {
        LayoutResolver {
            registry: built_in_layouts(),
        }
    }
}

impl LayoutResolver {
    /// Classifies the job's inputs into a `LayoutSource`. Done once at job
    /// start; the per-row loop never re-branches on this.
    pub fn source(
        template_type: Option<&str>,
        mapping: Option<&ColumnMapping>,
    ) -> Result<LayoutSource, EngineError> {
        if let Some(m) = mapping {
            if !m.is_empty() {
                return Ok(LayoutSource::Dynamic(m.clone()));
            }
        }
        match template_type {
            Some(t) => Ok(LayoutSource::Named(t.to_string())),
            None => Err(EngineError::UnknownTemplateType("(ninguno)".to_string())),
        }
    }

    /// Resolves a `LayoutSource` into a concrete layout.
    pub fn resolve(&self, source: &LayoutSource) -> Result<Layout, EngineError> {
        match source {
            LayoutSource::Dynamic(mapping) => Ok(dynamic_layout(mapping)),
            LayoutSource::Named(template_type) => self
                .registry
                .get(template_type)
                .cloned()
                .ok_or_else(|| EngineError::UnknownTemplateType(template_type.clone())),
        }
    }
}

/// Synthesizes a layout from the mapping, one element per entry in
/// insertion order. First entry takes the title slot, second the subtitle,
/// the rest flow into the body.
fn dynamic_layout(mapping: &ColumnMapping) -> Layout {
    let elements = mapping
        .iter()
        .enumerate()
        .map(|(i, entry)| LayoutElement {
            placeholder: entry.placeholder.clone(),
            slot: match i {
                0 => LayoutSlot::Title,
                1 => LayoutSlot::Subtitle,
                _ => LayoutSlot::Body,
            },
        })
        .collect();

    Layout {
        name: "dinamico".to_string(),
        elements,
    }
}

fn layout(name: &str, elements: &[(&str, LayoutSlot)]) -> Layout {
    Layout {
        name: name.to_string(),
        elements: elements
            .iter()
            .map(|(placeholder, slot)| LayoutElement {
                placeholder: placeholder.to_string(),
                slot: *slot,
            })
            .collect(),
    }
}

/// The static library of named layouts shipped with the product.
fn built_in_layouts() -> HashMap<String, Layout> {
    let mut registry = HashMap::new();

    registry.insert(
        "ficha_local".to_string(),
        layout(
            "ficha_local",
            &[
                ("Nombre", LayoutSlot::Title),
                ("Direccion", LayoutSlot::Subtitle),
                ("Telefono", LayoutSlot::Body),
                ("Horario", LayoutSlot::Body),
                ("Descripcion", LayoutSlot::Body),
            ],
        ),
    );
    registry.insert(
        "ficha_producto".to_string(),
        layout(
            "ficha_producto",
            &[
                ("Nombre", LayoutSlot::Title),
                ("Categoria", LayoutSlot::Subtitle),
                ("Precio", LayoutSlot::Accent),
                ("Descripcion", LayoutSlot::Body),
            ],
        ),
    );
    registry.insert(
        "listado".to_string(),
        layout(
            "listado",
            &[
                ("Titulo", LayoutSlot::Title),
                ("Detalle", LayoutSlot::Body),
            ],
        ),
    );

    registry
}
