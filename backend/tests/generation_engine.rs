//! Drives the generation engine against an in-memory store and a scriptable
//! fake presentation editor. No network, no sleeps (delays zeroed).

use backend::config::EngineConfig;
use backend::engine::error::{EngineError, SlideError};
use backend::engine::generation::GenerationJobEngine;
use backend::engine::slide_builder::{JobProgress, ProjectNotifier, SlideBuilder};
use backend::engine::store::{JobStore, SqliteJobStore};
use common::model::generation::{
    GenerationJob, GenerationJobItem, ItemState, JobState,
};
use common::model::replacement::ReplacementOperation;
use common::model::row::RowData;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// Scriptable fake of the presentation editor. Each `duplicate_slide` /
/// `apply_replacements` call pops the next scripted error, succeeding when
/// the script is empty or the entry is `None`.
#[derive(Default)]
struct FakeSlides {
    inner: Mutex<FakeInner>,
}

#[derive(Default)]
struct FakeInner {
    initial_slides: usize,
    dup_script: VecDeque<Option<SlideError>>,
    apply_script: VecDeque<Option<SlideError>>,
    fail_delete: bool,
    next_slide: usize,
    created: Vec<(String, usize)>,
    replacements: Vec<Vec<ReplacementOperation>>,
    deleted: Vec<String>,
}

impl FakeSlides {
    fn with_slides(initial_slides: usize) -> Self {
        let fake = FakeSlides::default();
        fake.inner.lock().unwrap().initial_slides = initial_slides;
        fake
    }

    fn script_duplicates(&self, errors: &[Option<SlideError>]) {
        self.inner.lock().unwrap().dup_script = errors.to_vec().into();
    }

    fn script_applies(&self, errors: &[Option<SlideError>]) {
        self.inner.lock().unwrap().apply_script = errors.to_vec().into();
    }

    fn fail_delete(&self) {
        self.inner.lock().unwrap().fail_delete = true;
    }

    fn created(&self) -> Vec<(String, usize)> {
        self.inner.lock().unwrap().created.clone()
    }

    fn replacements(&self) -> Vec<Vec<ReplacementOperation>> {
        self.inner.lock().unwrap().replacements.clone()
    }

    fn deleted(&self) -> Vec<String> {
        self.inner.lock().unwrap().deleted.clone()
    }
}

impl SlideBuilder for FakeSlides {
    fn slide_count(&self, _presentation_id: &str) -> Result<usize, SlideError> {
        Ok(self.inner.lock().unwrap().initial_slides)
    }

    fn first_slide_id(&self, _presentation_id: &str) -> Result<String, SlideError> {
        Ok("tpl-1".to_string())
    }

    fn duplicate_slide(
        &self,
        _presentation_id: &str,
        _template_slide_id: &str,
        insertion_index: usize,
    ) -> Result<String, SlideError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(Some(err)) = inner.dup_script.pop_front() {
            return Err(err);
        }
        inner.next_slide += 1;
        let slide_id = format!("slide-{}", inner.next_slide);
        inner.created.push((slide_id.clone(), insertion_index));
        Ok(slide_id)
    }

    fn apply_replacements(
        &self,
        _presentation_id: &str,
        operations: &[ReplacementOperation],
    ) -> Result<(), SlideError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(Some(err)) = inner.apply_script.pop_front() {
            return Err(err);
        }
        inner.replacements.push(operations.to_vec());
        Ok(())
    }

    fn delete_slide(&self, _presentation_id: &str, slide_id: &str) -> Result<(), SlideError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_delete {
            return Err(SlideError::Other("sin permiso".to_string()));
        }
        inner.deleted.push(slide_id.to_string());
        Ok(())
    }
}

#[derive(Default)]
struct RecordingNotifier {
    calls: Mutex<Vec<(String, String, Option<String>)>>,
}

impl ProjectNotifier for RecordingNotifier {
    fn presentation_generated(
        &self,
        project_id: &str,
        presentation_id: &str,
        first_slide_id: Option<&str>,
    ) -> Result<(), String> {
        self.calls.lock().unwrap().push((
            project_id.to_string(),
            presentation_id.to_string(),
            first_slide_id.map(str::to_string),
        ));
        Ok(())
    }
}

/// Captures every progress observation so tests can assert the counter
/// invariant at each point in time.
#[derive(Default)]
struct RecordingProgress {
    observations: Mutex<Vec<(usize, usize, usize)>>,
}

impl JobProgress for RecordingProgress {
    fn on_item(&self, processed: usize, errored: usize, total: usize) {
        self.observations
            .lock()
            .unwrap()
            .push((processed, errored, total));
    }
}

fn immediate_config() -> EngineConfig {
    EngineConfig {
        max_retries: 3,
        rate_limit_backoff: Duration::ZERO,
        inter_item_delay: Duration::ZERO,
    }
}

fn job_with_rows(id: &str, headers: &[&str], rows: &[&[&str]]) -> (GenerationJob, Vec<GenerationJobItem>) {
    let job = GenerationJob {
        id: id.to_string(),
        presentation_id: "pres-1".into(),
        spreadsheet_id: "sheet-1".into(),
        project_id: None,
        template_type: Some("ficha_local".into()),
        column_mapping: None,
        slide_template_id: None,
        headers: headers.iter().map(|h| h.to_string()).collect(),
        state: JobState::Pendiente,
        total_rows: rows.len(),
        filas_procesadas: 0,
        filas_error: 0,
        errores: Vec::new(),
        created_at: String::new(),
        updated_at: String::new(),
    };
    let items = rows
        .iter()
        .enumerate()
        .map(|(i, cells)| GenerationJobItem {
            id: format!("{id}-item-{i}"),
            job_id: id.to_string(),
            row_index: i,
            row_data: RowData {
                row_index: i,
                cells: cells.iter().map(|c| c.to_string()).collect(),
            },
            state: ItemState::Pendiente,
            result_slide_id: None,
            error_message: None,
        })
        .collect();
    (job, items)
}

#[test]
fn test_job_generates_slides_in_row_order() {
    let store = SqliteJobStore::open_in_memory().unwrap();
    let slides = FakeSlides::with_slides(1);
    let (job, items) = job_with_rows(
        "j1",
        &["Nombre", "Direccion"],
        &[&["Bar Pepe", "Calle 1"], &["Casa Ana", "Calle 2"], &["El Faro", "Calle 3"]],
    );
    store.create_job(&job, &items).unwrap();

    let engine = GenerationJobEngine::new(&store, &slides, immediate_config());
    let summary = engine.start("j1").unwrap();

    assert_eq!(summary.generadas, 3);
    assert_eq!(summary.fallidas, 0);

    // Slides append after the existing one, in strict row order.
    let indexes: Vec<usize> = slides.created().iter().map(|(_, i)| *i).collect();
    assert_eq!(indexes, vec![1, 2, 3]);

    let stored = store.job("j1").unwrap().unwrap();
    assert_eq!(stored.state, JobState::Completado);
    for item in store.items("j1").unwrap() {
        assert_eq!(item.state, ItemState::Completado);
        assert!(item.result_slide_id.is_some());
    }
    // Template cleanup ran.
    assert_eq!(slides.deleted(), vec!["tpl-1".to_string()]);
}

#[test]
fn test_replacements_are_scoped_to_the_new_slide() {
    let store = SqliteJobStore::open_in_memory().unwrap();
    let slides = FakeSlides::with_slides(1);
    let (job, items) = job_with_rows("j1", &["Nombre"], &[&["Bar Pepe"]]);
    store.create_job(&job, &items).unwrap();

    GenerationJobEngine::new(&store, &slides, immediate_config())
        .start("j1")
        .unwrap();

    let batches = slides.replacements();
    assert_eq!(batches.len(), 1);
    let nombre = batches[0]
        .iter()
        .find(|op| op.match_text == "{{Nombre}}")
        .expect("token {{Nombre}} stamped");
    assert_eq!(nombre.replace_text, "Bar Pepe");
    assert_eq!(
        nombre.scope_slide_ids.as_deref(),
        Some(&["slide-1".to_string()][..])
    );
}

#[test]
fn test_start_twice_is_an_idempotent_noop() {
    let store = SqliteJobStore::open_in_memory().unwrap();
    let slides = FakeSlides::with_slides(1);
    let (job, items) = job_with_rows("j1", &["Nombre"], &[&["Ana"]]);
    store.create_job(&job, &items).unwrap();

    let engine = GenerationJobEngine::new(&store, &slides, immediate_config());
    engine.start("j1").unwrap();
    let created_after_first = slides.created().len();

    let summary = engine.start("j1").unwrap();
    assert_eq!(slides.created().len(), created_after_first);
    assert_eq!(summary.generadas, 1);
}

#[test]
fn test_failed_item_consumes_no_slot_and_loop_continues() {
    let store = SqliteJobStore::open_in_memory().unwrap();
    let slides = FakeSlides::with_slides(1);
    // Second row's duplicate fails outright.
    slides.script_duplicates(&[
        None,
        Some(SlideError::Other("shape desconocido".to_string())),
        None,
    ]);
    let (job, items) = job_with_rows(
        "j1",
        &["Nombre"],
        &[&["uno"], &["dos"], &["tres"]],
    );
    store.create_job(&job, &items).unwrap();

    let summary = GenerationJobEngine::new(&store, &slides, immediate_config())
        .start("j1")
        .unwrap();

    assert_eq!(summary.generadas, 2);
    assert_eq!(summary.fallidas, 1);
    // Row 1 (0-based) is reported as spreadsheet row 3.
    assert_eq!(summary.errores.len(), 1);
    assert_eq!(summary.errores[0].row, 3);

    // The failed row did not occupy an insertion slot.
    let indexes: Vec<usize> = slides.created().iter().map(|(_, i)| *i).collect();
    assert_eq!(indexes, vec![1, 2]);

    let states: Vec<ItemState> = store
        .items("j1")
        .unwrap()
        .iter()
        .map(|i| i.state)
        .collect();
    assert_eq!(
        states,
        vec![ItemState::Completado, ItemState::Error, ItemState::Completado]
    );
    assert_eq!(store.job("j1").unwrap().unwrap().state, JobState::Completado);
}

#[test]
fn test_rate_limit_retries_then_succeeds() {
    let store = SqliteJobStore::open_in_memory().unwrap();
    let slides = FakeSlides::with_slides(1);
    // Item 3 of 5 is rate limited on its first two attempts.
    slides.script_duplicates(&[
        None,
        None,
        Some(SlideError::RateLimited),
        Some(SlideError::RateLimited),
        None,
        None,
        None,
    ]);
    let (job, items) = job_with_rows(
        "j1",
        &["Nombre"],
        &[&["a"], &["b"], &["c"], &["d"], &["e"]],
    );
    store.create_job(&job, &items).unwrap();

    let summary = GenerationJobEngine::new(&store, &slides, immediate_config())
        .start("j1")
        .unwrap();

    assert_eq!(summary.generadas, 5);
    assert_eq!(summary.fallidas, 0);
    let indexes: Vec<usize> = slides.created().iter().map(|(_, i)| *i).collect();
    assert_eq!(indexes, vec![1, 2, 3, 4, 5]);
}

#[test]
fn test_rate_limit_retry_bound_converts_item_to_error() {
    let store = SqliteJobStore::open_in_memory().unwrap();
    let slides = FakeSlides::with_slides(1);
    // One more 429 than the retry budget (3 retries = 4 attempts).
    slides.script_duplicates(&[
        Some(SlideError::RateLimited),
        Some(SlideError::RateLimited),
        Some(SlideError::RateLimited),
        Some(SlideError::RateLimited),
    ]);
    let (job, items) = job_with_rows("j1", &["Nombre"], &[&["a"]]);
    store.create_job(&job, &items).unwrap();

    let summary = GenerationJobEngine::new(&store, &slides, immediate_config())
        .start("j1")
        .unwrap();

    assert_eq!(summary.generadas, 0);
    assert_eq!(summary.fallidas, 1);
    assert!(summary.errores[0].message.contains("rate limited"));
    assert!(slides.created().is_empty());
}

#[test]
fn test_resume_processes_only_pending_items() {
    let store = SqliteJobStore::open_in_memory().unwrap();
    let slides = FakeSlides::with_slides(3);
    let (job, mut items) = job_with_rows(
        "j1",
        &["Nombre"],
        &[&["a"], &["b"], &["c"], &["d"]],
    );
    // Simulate a crash mid-job: one row done, one errored, two pending.
    items[0].state = ItemState::Completado;
    items[0].result_slide_id = Some("slide-previo".to_string());
    items[1].state = ItemState::Error;
    items[1].error_message = Some("fallo anterior".to_string());
    store.create_job(&job, &items).unwrap();
    store.update_job_state("j1", JobState::Procesando).unwrap();
    store.update_job_progress("j1", 1, 1, &[]).unwrap();

    let summary = GenerationJobEngine::new(&store, &slides, immediate_config())
        .resume("j1")
        .unwrap();

    // Exactly the two pending rows were generated.
    assert_eq!(slides.created().len(), 2);
    assert_eq!(summary.generadas, 3);
    assert_eq!(summary.fallidas, 1);

    let stored = store.items("j1").unwrap();
    // The completed item kept its original slide; the errored one was not retried.
    assert_eq!(stored[0].result_slide_id.as_deref(), Some("slide-previo"));
    assert_eq!(stored[1].state, ItemState::Error);
}

#[test]
fn test_missing_placeholder_resolves_empty_and_row_completes() {
    let store = SqliteJobStore::open_in_memory().unwrap();
    let slides = FakeSlides::with_slides(1);
    // ficha_local wants "Nombre", the sheet only has "Precio".
    let (job, items) = job_with_rows("j1", &["Precio"], &[&["100"]]);
    store.create_job(&job, &items).unwrap();

    let summary = GenerationJobEngine::new(&store, &slides, immediate_config())
        .start("j1")
        .unwrap();

    assert_eq!(summary.generadas, 1);
    assert_eq!(summary.fallidas, 0);
    let batches = slides.replacements();
    let nombre = batches[0]
        .iter()
        .find(|op| op.match_text == "{{Nombre}}")
        .unwrap();
    assert_eq!(nombre.replace_text, "");
}

#[test]
fn test_unknown_template_type_aborts_before_any_item() {
    let store = SqliteJobStore::open_in_memory().unwrap();
    let slides = FakeSlides::with_slides(1);
    let (mut job, items) = job_with_rows("j1", &["Nombre"], &[&["a"], &["b"]]);
    job.template_type = Some("no_existe".to_string());
    store.create_job(&job, &items).unwrap();

    let err = GenerationJobEngine::new(&store, &slides, immediate_config())
        .start("j1")
        .unwrap_err();
    assert!(matches!(err, EngineError::UnknownTemplateType(_)));

    assert!(slides.created().is_empty());
    for item in store.items("j1").unwrap() {
        assert_eq!(item.state, ItemState::Pendiente);
    }
}

#[test]
fn test_counters_invariant_holds_at_every_observation() {
    let store = SqliteJobStore::open_in_memory().unwrap();
    let slides = FakeSlides::with_slides(1);
    slides.script_duplicates(&[None, Some(SlideError::Other("x".to_string())), None]);
    let (job, items) = job_with_rows("j1", &["Nombre"], &[&["a"], &["b"], &["c"]]);
    store.create_job(&job, &items).unwrap();
    let progress = RecordingProgress::default();

    GenerationJobEngine::new(&store, &slides, immediate_config())
        .with_progress(&progress)
        .start("j1")
        .unwrap();

    let observations = progress.observations.lock().unwrap();
    assert_eq!(observations.len(), 3);
    for (processed, errored, total) in observations.iter() {
        assert!(processed + errored <= *total);
    }
    assert_eq!(*observations.last().unwrap(), (2, 1, 3));
}

#[test]
fn test_cleanup_failure_does_not_fail_the_job() {
    let store = SqliteJobStore::open_in_memory().unwrap();
    let slides = FakeSlides::with_slides(1);
    slides.fail_delete();
    let (job, items) = job_with_rows("j1", &["Nombre"], &[&["a"]]);
    store.create_job(&job, &items).unwrap();

    let summary = GenerationJobEngine::new(&store, &slides, immediate_config())
        .start("j1")
        .unwrap();

    assert_eq!(summary.generadas, 1);
    assert_eq!(store.job("j1").unwrap().unwrap().state, JobState::Completado);
}

#[test]
fn test_completion_notifies_owning_project() {
    let store = SqliteJobStore::open_in_memory().unwrap();
    let slides = FakeSlides::with_slides(1);
    let (mut job, items) = job_with_rows("j1", &["Nombre"], &[&["a"], &["b"]]);
    job.project_id = Some("proyecto-7".to_string());
    store.create_job(&job, &items).unwrap();
    let notifier = RecordingNotifier::default();

    GenerationJobEngine::new(&store, &slides, immediate_config())
        .with_notifier(&notifier)
        .start("j1")
        .unwrap();

    let calls = notifier.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    let (project, presentation, first_slide) = &calls[0];
    assert_eq!(project, "proyecto-7");
    assert_eq!(presentation, "pres-1");
    assert_eq!(first_slide.as_deref(), Some("slide-1"));
}

#[test]
fn test_pinned_template_slide_is_used_and_cleaned_up() {
    let store = SqliteJobStore::open_in_memory().unwrap();
    let slides = FakeSlides::with_slides(2);
    let (mut job, items) = job_with_rows("j1", &["Nombre"], &[&["a"]]);
    job.slide_template_id = Some("tpl-propio".to_string());
    store.create_job(&job, &items).unwrap();

    GenerationJobEngine::new(&store, &slides, immediate_config())
        .start("j1")
        .unwrap();

    assert_eq!(slides.deleted(), vec!["tpl-propio".to_string()]);
}

#[test]
fn test_apply_failure_removes_orphan_slide_and_frees_the_slot() {
    let store = SqliteJobStore::open_in_memory().unwrap();
    let slides = FakeSlides::with_slides(1);
    slides.script_applies(&[Some(SlideError::Other("texto ilegal".to_string())), None]);
    let (job, items) = job_with_rows("j1", &["Nombre"], &[&["a"], &["b"]]);
    store.create_job(&job, &items).unwrap();

    let summary = GenerationJobEngine::new(&store, &slides, immediate_config())
        .start("j1")
        .unwrap();

    assert_eq!(summary.generadas, 1);
    assert_eq!(summary.fallidas, 1);
    // slide-1 was orphaned and deleted; the second row reused its slot.
    assert!(slides.deleted().contains(&"slide-1".to_string()));
    let indexes: Vec<usize> = slides.created().iter().map(|(_, i)| *i).collect();
    assert_eq!(indexes, vec![1, 1]);
}
