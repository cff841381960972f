//! Durable job/item persistence.
//!
//! The store is the single source of truth for generation progress: every
//! item transition is written synchronously before the loop moves on, so a
//! crash between items always leaves a consistent, resumable state. No
//! in-memory state survives a restart, and nothing here is ever treated as
//! authoritative except what was committed.

use crate::engine::error::StoreError;
use crate::engine::slide_builder::ProjectNotifier;
use common::model::generation::{
    GenerationJob, GenerationJobItem, ItemState, JobState, RowError,
};
use common::model::row::{ColumnMapping, RowData};
use rusqlite::{params, Connection, Row};
use std::path::Path;
use std::sync::Mutex;

/// CRUD surface the engine needs. Narrow on purpose: the loop's retry and
/// backoff logic is unit-tested against an in-memory database with no
/// network in sight.
pub trait JobStore {
    fn create_job(
        &self,
        job: &GenerationJob,
        items: &[GenerationJobItem],
    ) -> Result<(), StoreError>;

    fn job(&self, job_id: &str) -> Result<Option<GenerationJob>, StoreError>;

    /// Items still `Pendiente`, ordered by ascending `row_index`. This query
    /// is what makes jobs resumable: completed and errored items are simply
    /// never selected again.
    fn pending_items(&self, job_id: &str) -> Result<Vec<GenerationJobItem>, StoreError>;

    /// All items of a job, ordered by ascending `row_index`.
    fn items(&self, job_id: &str) -> Result<Vec<GenerationJobItem>, StoreError>;

    fn update_item(&self, item: &GenerationJobItem) -> Result<(), StoreError>;

    fn update_job_state(&self, job_id: &str, state: JobState) -> Result<(), StoreError>;

    /// Persists the running counters and the accumulated error list.
    fn update_job_progress(
        &self,
        job_id: &str,
        filas_procesadas: usize,
        filas_error: usize,
        errores: &[RowError],
    ) -> Result<(), StoreError>;

    /// `result_slide_id` of the lowest-row completed item, if any. Feeds the
    /// denormalized pointer pushed to the owning project on completion.
    fn first_result_slide_id(&self, job_id: &str) -> Result<Option<String>, StoreError>;

    /// Deletes the job; items go with it via the cascade.
    fn delete_job(&self, job_id: &str) -> Result<(), StoreError>;
}

pub struct SqliteJobStore {
    conn: Mutex<Connection>,
}

impl SqliteJobStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS generation_jobs (
                id                TEXT PRIMARY KEY,
                presentation_id   TEXT NOT NULL,
                spreadsheet_id    TEXT NOT NULL,
                project_id        TEXT,
                template_type     TEXT,
                column_mapping    TEXT,
                slide_template_id TEXT,
                headers           TEXT NOT NULL,
                state             TEXT NOT NULL,
                total_rows        INTEGER NOT NULL,
                filas_procesadas  INTEGER NOT NULL DEFAULT 0,
                filas_error       INTEGER NOT NULL DEFAULT 0,
                errores           TEXT NOT NULL DEFAULT '[]',
                created_at        TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at        TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS generation_job_items (
                id              TEXT PRIMARY KEY,
                job_id          TEXT NOT NULL
                                REFERENCES generation_jobs(id) ON DELETE CASCADE,
                row_index       INTEGER NOT NULL,
                row_data        TEXT NOT NULL,
                state           TEXT NOT NULL,
                result_slide_id TEXT,
                error_message   TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_job_items_state
                ON generation_job_items (job_id, state);

            CREATE TABLE IF NOT EXISTS projects (
                id                     TEXT PRIMARY KEY,
                latest_presentation_id TEXT,
                first_slide_id         TEXT,
                updated_at             TEXT NOT NULL DEFAULT (datetime('now'))
            );",
        )?;
        Ok(SqliteJobStore {
            conn: Mutex::new(conn),
        })
    }
}

/// A job row with its JSON columns still raw; decoded by the caller so
/// serde errors can surface as `StoreError`.
struct RawJobRow {
    job: GenerationJob,
    mapping_json: Option<String>,
    headers_json: String,
    errores_json: String,
}

fn job_from_row(row: &Row) -> rusqlite::Result<RawJobRow> {
    let state_raw: String = row.get("state")?;
    Ok(RawJobRow {
        job: GenerationJob {
            id: row.get("id")?,
            presentation_id: row.get("presentation_id")?,
            spreadsheet_id: row.get("spreadsheet_id")?,
            project_id: row.get("project_id")?,
            template_type: row.get("template_type")?,
            column_mapping: None,
            slide_template_id: row.get("slide_template_id")?,
            headers: Vec::new(),
            state: JobState::parse(&state_raw).unwrap_or(JobState::Pendiente),
            total_rows: row.get::<_, i64>("total_rows")? as usize,
            filas_procesadas: row.get::<_, i64>("filas_procesadas")? as usize,
            filas_error: row.get::<_, i64>("filas_error")? as usize,
            errores: Vec::new(),
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        },
        mapping_json: row.get("column_mapping")?,
        headers_json: row.get("headers")?,
        errores_json: row.get("errores")?,
    })
}

fn item_from_row(row: &Row) -> rusqlite::Result<(GenerationJobItem, String)> {
    let state_raw: String = row.get("state")?;
    let row_data_json: String = row.get("row_data")?;
    Ok((
        GenerationJobItem {
            id: row.get("id")?,
            job_id: row.get("job_id")?,
            row_index: row.get::<_, i64>("row_index")? as usize,
            row_data: RowData {
                row_index: 0,
                cells: Vec::new(),
            },
            state: ItemState::parse(&state_raw).unwrap_or(ItemState::Pendiente),
            result_slide_id: row.get("result_slide_id")?,
            error_message: row.get("error_message")?,
        },
        row_data_json,
    ))
}

fn decode_item((mut item, row_data_json): (GenerationJobItem, String)) -> Result<GenerationJobItem, StoreError> {
    item.row_data = serde_json::from_str(&row_data_json)?;
    Ok(item)
}

impl JobStore for SqliteJobStore {
    fn create_job(
        &self,
        job: &GenerationJob,
        items: &[GenerationJobItem],
    ) -> Result<(), StoreError> {
        let mapping_json = job
            .column_mapping
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let headers_json = serde_json::to_string(&job.headers)?;
        let errores_json = serde_json::to_string(&job.errores)?;

        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO generation_jobs
                (id, presentation_id, spreadsheet_id, project_id, template_type,
                 column_mapping, slide_template_id, headers, state, total_rows,
                 filas_procesadas, filas_error, errores)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                job.id,
                job.presentation_id,
                job.spreadsheet_id,
                job.project_id,
                job.template_type,
                mapping_json,
                job.slide_template_id,
                headers_json,
                job.state.as_str(),
                job.total_rows as i64,
                job.filas_procesadas as i64,
                job.filas_error as i64,
                errores_json,
            ],
        )?;
        for item in items {
            tx.execute(
                "INSERT INTO generation_job_items
                    (id, job_id, row_index, row_data, state, result_slide_id, error_message)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    item.id,
                    item.job_id,
                    item.row_index as i64,
                    serde_json::to_string(&item.row_data)?,
                    item.state.as_str(),
                    item.result_slide_id,
                    item.error_message,
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn job(&self, job_id: &str) -> Result<Option<GenerationJob>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT * FROM generation_jobs WHERE id = ?1")?;
        let mut rows = stmt.query(params![job_id])?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };
        let raw = job_from_row(row)?;
        let mut job = raw.job;
        job.headers = serde_json::from_str(&raw.headers_json)?;
        job.errores = serde_json::from_str(&raw.errores_json)?;
        job.column_mapping = raw
            .mapping_json
            .as_deref()
            .map(serde_json::from_str::<ColumnMapping>)
            .transpose()?;
        Ok(Some(job))
    }

    fn pending_items(&self, job_id: &str) -> Result<Vec<GenerationJobItem>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT * FROM generation_job_items
             WHERE job_id = ?1 AND state = 'pendiente'
             ORDER BY row_index ASC",
        )?;
        let rows = stmt.query_map(params![job_id], item_from_row)?;
        rows.map(|r| decode_item(r?)).collect()
    }

    fn items(&self, job_id: &str) -> Result<Vec<GenerationJobItem>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT * FROM generation_job_items
             WHERE job_id = ?1
             ORDER BY row_index ASC",
        )?;
        let rows = stmt.query_map(params![job_id], item_from_row)?;
        rows.map(|r| decode_item(r?)).collect()
    }

    fn update_item(&self, item: &GenerationJobItem) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE generation_job_items
             SET state = ?1, result_slide_id = ?2, error_message = ?3
             WHERE id = ?4",
            params![
                item.state.as_str(),
                item.result_slide_id,
                item.error_message,
                item.id,
            ],
        )?;
        Ok(())
    }

    fn update_job_state(&self, job_id: &str, state: JobState) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE generation_jobs
             SET state = ?1, updated_at = datetime('now')
             WHERE id = ?2",
            params![state.as_str(), job_id],
        )?;
        Ok(())
    }

    fn update_job_progress(
        &self,
        job_id: &str,
        filas_procesadas: usize,
        filas_error: usize,
        errores: &[RowError],
    ) -> Result<(), StoreError> {
        let errores_json = serde_json::to_string(errores)?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE generation_jobs
             SET filas_procesadas = ?1, filas_error = ?2, errores = ?3,
                 updated_at = datetime('now')
             WHERE id = ?4",
            params![
                filas_procesadas as i64,
                filas_error as i64,
                errores_json,
                job_id,
            ],
        )?;
        Ok(())
    }

    fn first_result_slide_id(&self, job_id: &str) -> Result<Option<String>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT result_slide_id FROM generation_job_items
             WHERE job_id = ?1 AND state = 'completado'
                   AND result_slide_id IS NOT NULL
             ORDER BY row_index ASC
             LIMIT 1",
        )?;
        let mut rows = stmt.query(params![job_id])?;
        match rows.next()? {
            Some(row) => Ok(row.get(0)?),
            None => Ok(None),
        }
    }

    fn delete_job(&self, job_id: &str) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM generation_jobs WHERE id = ?1", params![job_id])?;
        Ok(())
    }
}

impl ProjectNotifier for SqliteJobStore {
    fn presentation_generated(
        &self,
        project_id: &str,
        presentation_id: &str,
        first_slide_id: Option<&str>,
    ) -> Result<(), String> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO projects (id, latest_presentation_id, first_slide_id, updated_at)
             VALUES (?1, ?2, ?3, datetime('now'))
             ON CONFLICT(id) DO UPDATE SET
                 latest_presentation_id = excluded.latest_presentation_id,
                 first_slide_id = excluded.first_slide_id,
                 updated_at = excluded.updated_at",
            params![project_id, presentation_id, first_slide_id],
        )
        .map_err(|e| e.to_string())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_job(id: &str) -> GenerationJob {
        GenerationJob {
            id: id.to_string(),
            presentation_id: "pres-1".into(),
            spreadsheet_id: "sheet-1".into(),
            project_id: None,
            template_type: Some("ficha_local".into()),
            column_mapping: None,
            slide_template_id: None,
            headers: vec!["Nombre".into(), "Precio".into()],
            state: JobState::Pendiente,
            total_rows: 2,
            filas_procesadas: 0,
            filas_error: 0,
            errores: Vec::new(),
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    fn sample_item(id: &str, job_id: &str, row_index: usize) -> GenerationJobItem {
        GenerationJobItem {
            id: id.to_string(),
            job_id: job_id.to_string(),
            row_index,
            row_data: RowData {
                row_index,
                cells: vec!["Ana".into(), "100".into()],
            },
            state: ItemState::Pendiente,
            result_slide_id: None,
            error_message: None,
        }
    }

    #[test]
    fn test_create_and_read_back_job() {
        let store = SqliteJobStore::open_in_memory().unwrap();
        let job = sample_job("j1");
        let items = vec![sample_item("i1", "j1", 0), sample_item("i2", "j1", 1)];
        store.create_job(&job, &items).unwrap();

        let read = store.job("j1").unwrap().unwrap();
        assert_eq!(read.headers, vec!["Nombre", "Precio"]);
        assert_eq!(read.state, JobState::Pendiente);
        assert_eq!(read.total_rows, 2);
        assert!(!read.created_at.is_empty());
    }

    #[test]
    fn test_pending_items_ordered_and_filtered() {
        let store = SqliteJobStore::open_in_memory().unwrap();
        let job = sample_job("j1");
        // Insert out of order on purpose.
        let mut done = sample_item("i3", "j1", 2);
        done.state = ItemState::Completado;
        done.result_slide_id = Some("slide-x".into());
        let items = vec![sample_item("i2", "j1", 1), done, sample_item("i1", "j1", 0)];
        store.create_job(&job, &items).unwrap();

        let pending = store.pending_items("j1").unwrap();
        let indexes: Vec<_> = pending.iter().map(|i| i.row_index).collect();
        assert_eq!(indexes, vec![0, 1]);
    }

    #[test]
    fn test_first_result_slide_id_picks_lowest_row() {
        let store = SqliteJobStore::open_in_memory().unwrap();
        let mut late = sample_item("i1", "j1", 3);
        late.state = ItemState::Completado;
        late.result_slide_id = Some("late".into());
        let mut early = sample_item("i2", "j1", 1);
        early.state = ItemState::Completado;
        early.result_slide_id = Some("early".into());
        store.create_job(&sample_job("j1"), &[late, early]).unwrap();

        assert_eq!(
            store.first_result_slide_id("j1").unwrap().as_deref(),
            Some("early")
        );
    }

    #[test]
    fn test_delete_job_cascades_to_items() {
        let store = SqliteJobStore::open_in_memory().unwrap();
        let job = sample_job("j1");
        store
            .create_job(&job, &[sample_item("i1", "j1", 0)])
            .unwrap();
        store.delete_job("j1").unwrap();
        assert!(store.job("j1").unwrap().is_none());
        assert!(store.items("j1").unwrap().is_empty());
    }

    #[test]
    fn test_progress_and_errors_round_trip() {
        let store = SqliteJobStore::open_in_memory().unwrap();
        store.create_job(&sample_job("j1"), &[]).unwrap();
        let errores = vec![RowError {
            row: 4,
            message: "fila inválida".into(),
        }];
        store.update_job_progress("j1", 1, 1, &errores).unwrap();
        store.update_job_state("j1", JobState::Completado).unwrap();

        let job = store.job("j1").unwrap().unwrap();
        assert_eq!(job.filas_procesadas, 1);
        assert_eq!(job.filas_error, 1);
        assert_eq!(job.errores.len(), 1);
        assert_eq!(job.errores[0].row, 4);
        assert_eq!(job.state, JobState::Completado);
    }
}
