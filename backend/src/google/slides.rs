//! Google Slides client implementing the engine's editing and reading seams.
//!
//! Everything mutating goes through `presentations/{id}:batchUpdate`. A 429
//! from the API maps to `SlideError::RateLimited`, which is the engine's cue
//! to back off and retry.

use crate::engine::error::SlideError;
use crate::engine::slide_builder::{
    PresentationReader, PresentationSnapshot, SlideBuilder, SlideSnapshot,
};
use crate::google::auth::AccessTokenProvider;
use common::model::replacement::ReplacementOperation;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

const SLIDES_BASE: &str = "https://slides.googleapis.com/v1/presentations";

pub struct SlidesApiClient {
    http: Client,
    tokens: Arc<dyn AccessTokenProvider>,
}

impl SlidesApiClient {
    pub fn new(tokens: Arc<dyn AccessTokenProvider>) -> Self {
        SlidesApiClient {
            http: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            tokens,
        }
    }

    fn get_presentation(&self, presentation_id: &str, fields: &str) -> Result<Value, SlideError> {
        let token = self
            .tokens
            .access_token()
            .map_err(SlideError::Other)?;
        let url = format!("{SLIDES_BASE}/{presentation_id}");
        let response = self
            .http
            .get(&url)
            .query(&[("fields", fields)])
            .bearer_auth(token)
            .send()
            .map_err(|e| SlideError::Other(e.to_string()))?;
        into_json(response)
    }

    fn batch_update(&self, presentation_id: &str, requests: Value) -> Result<Value, SlideError> {
        let token = self
            .tokens
            .access_token()
            .map_err(SlideError::Other)?;
        let url = format!("{SLIDES_BASE}/{presentation_id}:batchUpdate");
        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&json!({ "requests": requests }))
            .send()
            .map_err(|e| SlideError::Other(e.to_string()))?;
        into_json(response)
    }
}

fn into_json(response: reqwest::blocking::Response) -> Result<Value, SlideError> {
    if response.status() == StatusCode::TOO_MANY_REQUESTS {
        return Err(SlideError::RateLimited);
    }
    if !response.status().is_success() {
        return Err(SlideError::Other(format!(
            "Slides respondió {}: {}",
            response.status(),
            response.text().unwrap_or_default()
        )));
    }
    response
        .json()
        .map_err(|e| SlideError::Other(e.to_string()))
}

impl SlideBuilder for SlidesApiClient {
    fn slide_count(&self, presentation_id: &str) -> Result<usize, SlideError> {
        let body = self.get_presentation(presentation_id, "slides(objectId)")?;
        Ok(body
            .get("slides")
            .and_then(Value::as_array)
            .map(Vec::len)
            .unwrap_or(0))
    }

    fn first_slide_id(&self, presentation_id: &str) -> Result<String, SlideError> {
        let body = self.get_presentation(presentation_id, "slides(objectId)")?;
        body.get("slides")
            .and_then(Value::as_array)
            .and_then(|s| s.first())
            .and_then(|s| s.get("objectId"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| SlideError::Other("la presentación no tiene diapositivas".into()))
    }

    fn duplicate_slide(
        &self,
        presentation_id: &str,
        template_slide_id: &str,
        insertion_index: usize,
    ) -> Result<String, SlideError> {
        // Preassigning the object id lets us move the copy into position in
        // the same batch, without waiting for the reply.
        let new_slide_id = format!("g{}", Uuid::new_v4().simple());
        let mut object_ids = serde_json::Map::new();
        object_ids.insert(template_slide_id.to_string(), json!(new_slide_id));
        self.batch_update(
            presentation_id,
            json!([
                {
                    "duplicateObject": {
                        "objectId": template_slide_id,
                        "objectIds": object_ids
                    }
                },
                {
                    "updateSlidesPosition": {
                        "slideObjectIds": [new_slide_id],
                        "insertionIndex": insertion_index
                    }
                }
            ]),
        )?;
        Ok(new_slide_id)
    }

    fn apply_replacements(
        &self,
        presentation_id: &str,
        operations: &[ReplacementOperation],
    ) -> Result<(), SlideError> {
        if operations.is_empty() {
            return Ok(());
        }
        let requests: Vec<Value> = operations
            .iter()
            .map(|op| {
                let mut request = json!({
                    "replaceAllText": {
                        "containsText": {
                            "text": op.match_text,
                            "matchCase": op.case_sensitive
                        },
                        "replaceText": op.replace_text
                    }
                });
                if let Some(scope) = &op.scope_slide_ids {
                    request["replaceAllText"]["pageObjectIds"] = json!(scope);
                }
                request
            })
            .collect();
        self.batch_update(presentation_id, Value::Array(requests))?;
        Ok(())
    }

    fn delete_slide(&self, presentation_id: &str, slide_id: &str) -> Result<(), SlideError> {
        self.batch_update(
            presentation_id,
            json!([{ "deleteObject": { "objectId": slide_id } }]),
        )?;
        Ok(())
    }
}

impl PresentationReader for SlidesApiClient {
    fn snapshot(&self, presentation_id: &str) -> Result<PresentationSnapshot, SlideError> {
        let fields = "slides(objectId,pageElements(shape.text.textElements.textRun.content,\
                      table.tableRows.tableCells.text.textElements.textRun.content))";
        let body = self.get_presentation(presentation_id, fields)?;

        let slides = body
            .get("slides")
            .and_then(Value::as_array)
            .map(|slides| {
                slides
                    .iter()
                    .map(|slide| SlideSnapshot {
                        slide_id: slide
                            .get("objectId")
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_string(),
                        texts: slide_texts(slide),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(PresentationSnapshot { slides })
    }
}

/// Flattens a slide's shape text runs and table cell text runs, in document
/// order.
fn slide_texts(slide: &Value) -> Vec<String> {
    let mut texts = Vec::new();
    let Some(elements) = slide.get("pageElements").and_then(Value::as_array) else {
        return texts;
    };
    for element in elements {
        if let Some(text) = element.pointer("/shape/text") {
            collect_text_runs(text, &mut texts);
        }
        if let Some(rows) = element.pointer("/table/tableRows").and_then(Value::as_array) {
            for row in rows {
                let Some(cells) = row.get("tableCells").and_then(Value::as_array) else {
                    continue;
                };
                for cell in cells {
                    if let Some(text) = cell.get("text") {
                        collect_text_runs(text, &mut texts);
                    }
                }
            }
        }
    }
    texts
}

fn collect_text_runs(text: &Value, out: &mut Vec<String>) {
    let Some(elements) = text.get("textElements").and_then(Value::as_array) else {
        return;
    };
    let joined: String = elements
        .iter()
        .filter_map(|e| e.pointer("/textRun/content").and_then(Value::as_str))
        .collect();
    if !joined.is_empty() {
        out.push(joined);
    }
}
