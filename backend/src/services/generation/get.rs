use crate::engine::store::JobStore;
use crate::services::AppContext;
use actix_web::{web, Responder};

/// Returns the persisted job record: durable counters, per-row errors and
/// timestamps. Unlike the status endpoint this survives a restart.
pub(crate) async fn process(
    job_id: web::Path<String>,
    ctx: web::Data<AppContext>,
) -> impl Responder {
    match ctx.store.job(&job_id.into_inner()) {
        Ok(Some(job)) => actix_web::HttpResponse::Ok().json(job),
        Ok(None) => actix_web::HttpResponse::NotFound().body("Job ID not found"),
        Err(e) => actix_web::HttpResponse::InternalServerError().body(e.to_string()),
    }
}
