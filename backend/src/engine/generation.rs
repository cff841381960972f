//! The generation job engine: one template slide + N data rows → N slides.
//!
//! Items are processed strictly one at a time, in ascending `row_index`
//! order, with a fixed sleep after every item. The external editing API
//! rate-limits mutations per presentation, so parallel writers would only
//! multiply 429s; the engine is a cooperative loop with explicit sleep
//! points, not a worker pool. Every state transition is persisted before the
//! loop continues, which is what makes an interrupted job resumable.

use crate::config::EngineConfig;
use crate::engine::error::{EngineError, SlideError};
use crate::engine::layout::LayoutResolver;
use crate::engine::rows;
use crate::engine::slide_builder::{JobProgress, ProjectNotifier, SlideBuilder};
use crate::engine::store::JobStore;
use common::model::generation::{
    GenerationJob, GenerationJobItem, GenerationSummary, ItemState, JobState, RowError,
};
use common::model::layout::Layout;
use common::model::replacement::ReplacementOperation;
use log::{debug, info, warn};
use std::thread;

pub struct GenerationJobEngine<'a> {
    store: &'a dyn JobStore,
    slides: &'a dyn SlideBuilder,
    layouts: LayoutResolver,
    notifier: Option<&'a dyn ProjectNotifier>,
    progress: Option<&'a dyn JobProgress>,
    config: EngineConfig,
}

impl<'a> GenerationJobEngine<'a> {
    pub fn new(
        store: &'a dyn JobStore,
        slides: &'a dyn SlideBuilder,
        config: EngineConfig,
    ) -> Self {
        GenerationJobEngine {
            store,
            slides,
            layouts: LayoutResolver::default(),
            notifier: None,
            progress: None,
            config,
        }
    }

    pub fn with_notifier(mut self, notifier: &'a dyn ProjectNotifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_progress(mut self, progress: &'a dyn JobProgress) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Starts a `Pendiente` job. Calling this on a job that is already
    /// `Procesando` or `Completado` is an idempotent no-op success, so a
    /// retried trigger can never launch a second concurrent run.
    pub fn start(&self, job_id: &str) -> Result<GenerationSummary, EngineError> {
        let job = self.load(job_id)?;
        if job.state != JobState::Pendiente {
            info!(
                "job {} ya está {}, start ignorado",
                job.id,
                job.state.as_str()
            );
            return Ok(summary_of(&job));
        }
        self.process_pending(job)
    }

    /// Re-runs the `Pendiente` items of a job that was interrupted while
    /// `Procesando` (crash, redeploy). Completed and errored items are never
    /// reprocessed; a `Completado` job is a no-op.
    pub fn resume(&self, job_id: &str) -> Result<GenerationSummary, EngineError> {
        let job = self.load(job_id)?;
        if job.state == JobState::Completado {
            return Ok(summary_of(&job));
        }
        self.process_pending(job)
    }

    fn load(&self, job_id: &str) -> Result<GenerationJob, EngineError> {
        self.store
            .job(job_id)?
            .ok_or_else(|| EngineError::JobNotFound(job_id.to_string()))
    }

    fn process_pending(&self, mut job: GenerationJob) -> Result<GenerationSummary, EngineError> {
        // Resolve the layout once, before touching any row. An unknown
        // template type aborts here, not per item.
        let source =
            LayoutResolver::source(job.template_type.as_deref(), job.column_mapping.as_ref())?;
        let layout = self.layouts.resolve(&source)?;

        job.state = JobState::Procesando;
        self.store.update_job_state(&job.id, JobState::Procesando)?;

        let template_slide_id = match &job.slide_template_id {
            Some(id) => id.clone(),
            None => self.slides.first_slide_id(&job.presentation_id)?,
        };
        let mut insertion_index = self.slides.slide_count(&job.presentation_id)?;

        let pending = self.store.pending_items(&job.id)?;
        info!(
            "job {}: {} filas pendientes de {} (layout {})",
            job.id,
            pending.len(),
            job.total_rows,
            layout.name
        );

        for mut item in pending {
            item.state = ItemState::Procesando;
            self.store.update_item(&item)?;

            let operations = self.build_operations(&layout, &job, &item);
            match self.generate_slide(
                &job.presentation_id,
                &template_slide_id,
                insertion_index,
                operations,
            ) {
                Ok(slide_id) => {
                    insertion_index += 1;
                    debug!("job {}: fila {} -> slide {}", job.id, item.row_index, slide_id);
                    item.state = ItemState::Completado;
                    item.result_slide_id = Some(slide_id);
                    item.error_message = None;
                    job.filas_procesadas += 1;
                }
                Err(err) => {
                    warn!(
                        "job {}: fila {} falló: {}",
                        job.id,
                        item.display_row(),
                        err
                    );
                    item.state = ItemState::Error;
                    item.error_message = Some(err.to_string());
                    job.filas_error += 1;
                    job.errores.push(RowError {
                        row: item.display_row(),
                        message: err.to_string(),
                    });
                }
            }

            self.store.update_item(&item)?;
            self.store.update_job_progress(
                &job.id,
                job.filas_procesadas,
                job.filas_error,
                &job.errores,
            )?;
            if let Some(progress) = self.progress {
                progress.on_item(job.filas_procesadas, job.filas_error, job.total_rows);
            }

            // Self-imposed pacing to stay under the editing API's quota,
            // independent of the 429 backoff.
            thread::sleep(self.config.inter_item_delay);
        }

        // The template slide served its purpose; removing it is cleanup,
        // not part of the job's success.
        if let Err(err) = self
            .slides
            .delete_slide(&job.presentation_id, &template_slide_id)
        {
            warn!(
                "job {}: no se pudo borrar la diapositiva plantilla {}: {}",
                job.id, template_slide_id, err
            );
        }

        job.state = JobState::Completado;
        self.store.update_job_state(&job.id, JobState::Completado)?;
        self.notify_completion(&job)?;

        info!(
            "job {} completado: {} generadas, {} fallidas",
            job.id, job.filas_procesadas, job.filas_error
        );
        Ok(summary_of(&job))
    }

    /// Builds the scoped token replacements for one row. Both `{{p}}` and
    /// `{p}` token forms are stamped, matching what templates in the wild
    /// actually contain.
    fn build_operations(
        &self,
        layout: &Layout,
        job: &GenerationJob,
        item: &GenerationJobItem,
    ) -> Vec<ReplacementOperation> {
        let mut operations = Vec::with_capacity(layout.elements.len() * 2);
        for placeholder in layout.placeholders() {
            let value = rows::resolve(
                placeholder,
                job.column_mapping.as_ref(),
                &job.headers,
                &item.row_data,
            );
            for token in [format!("{{{{{placeholder}}}}}"), format!("{{{placeholder}}}")] {
                operations.push(ReplacementOperation {
                    match_text: token,
                    replace_text: value.clone(),
                    case_sensitive: true,
                    scope_slide_ids: None, // filled in once the slide exists
                });
            }
        }
        operations
    }

    /// Duplicates the template and stamps the row's values onto the copy.
    ///
    /// Rate-limit errors retry the failing call with a bounded backoff. If
    /// the duplicate succeeded but the replacements ultimately failed, the
    /// orphan slide is removed best-effort so a failed item never consumes
    /// an insertion slot.
    fn generate_slide(
        &self,
        presentation_id: &str,
        template_slide_id: &str,
        insertion_index: usize,
        mut operations: Vec<ReplacementOperation>,
    ) -> Result<String, SlideError> {
        let slide_id = self.with_rate_limit_retry(|| {
            self.slides
                .duplicate_slide(presentation_id, template_slide_id, insertion_index)
        })?;

        for op in &mut operations {
            op.scope_slide_ids = Some(vec![slide_id.clone()]);
        }

        let applied = self
            .with_rate_limit_retry(|| self.slides.apply_replacements(presentation_id, &operations));
        if let Err(err) = applied {
            if let Err(cleanup) = self.slides.delete_slide(presentation_id, &slide_id) {
                warn!("no se pudo borrar la diapositiva huérfana {slide_id}: {cleanup}");
            }
            return Err(err);
        }

        Ok(slide_id)
    }

    fn with_rate_limit_retry<T>(
        &self,
        mut op: impl FnMut() -> Result<T, SlideError>,
    ) -> Result<T, SlideError> {
        let mut attempt = 0;
        loop {
            match op() {
                Err(SlideError::RateLimited) if attempt < self.config.max_retries => {
                    attempt += 1;
                    warn!(
                        "API saturada (429), reintento {}/{}",
                        attempt, self.config.max_retries
                    );
                    thread::sleep(self.config.rate_limit_backoff);
                }
                other => return other,
            }
        }
    }

    fn notify_completion(&self, job: &GenerationJob) -> Result<(), EngineError> {
        let Some(notifier) = self.notifier else {
            return Ok(());
        };
        let Some(project_id) = &job.project_id else {
            return Ok(());
        };
        let first_slide = self.store.first_result_slide_id(&job.id)?;
        if let Err(err) = notifier.presentation_generated(
            project_id,
            &job.presentation_id,
            first_slide.as_deref(),
        ) {
            warn!(
                "job {}: no se pudo notificar al proyecto {}: {}",
                job.id, project_id, err
            );
        }
        Ok(())
    }
}

fn summary_of(job: &GenerationJob) -> GenerationSummary {
    GenerationSummary {
        generadas: job.filas_procesadas,
        fallidas: job.filas_error,
        errores: job.errores.clone(),
    }
}
