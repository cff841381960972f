use crate::engine::store::JobStore;
use crate::job_controller::state::JobsState;
use super::start::{schedule_run, RunKind};
use crate::services::AppContext;
use actix_web::{web, HttpResponse, Responder};

/// Recovers a job interrupted while `Procesando`: only its still-pending
/// items are reprocessed. Completed jobs schedule a no-op run that just
/// reports the stored summary.
pub(crate) async fn process(
    job_id: web::Path<String>,
    state: web::Data<JobsState>,
    ctx: web::Data<AppContext>,
) -> impl Responder {
    let job_id = job_id.into_inner();
    match ctx.store.job(&job_id) {
        Ok(Some(_)) => {
            schedule_run(state, ctx, job_id.clone(), RunKind::Resume).await;
            HttpResponse::Ok().json(serde_json::json!({ "job_id": job_id }))
        }
        Ok(None) => HttpResponse::NotFound().body("Job ID not found"),
        Err(e) => HttpResponse::InternalServerError().body(e.to_string()),
    }
}
