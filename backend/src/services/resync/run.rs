use crate::engine::resync::ResyncDiffer;
use crate::engine::rows;
use crate::engine::slide_builder::{PresentationReader, SlideBuilder, SpreadsheetReader};
use crate::services::AppContext;
use actix_web::{web, HttpResponse, Responder};
use common::model::resync::ResyncReport;
use common::requests::ResyncRequest;
use log::info;
use std::sync::Arc;

const DEFAULT_RANGE: &str = "A1:ZZ1000";

pub(crate) async fn process(
    ctx: web::Data<AppContext>,
    payload: web::Json<ResyncRequest>,
) -> impl Responder {
    let ctx = ctx.into_inner();
    let req = payload.into_inner();
    let handle = tokio::task::spawn_blocking(move || resync_blocking(ctx, req));
    match handle.await {
        Ok(Ok(report)) => HttpResponse::Ok().json(report),
        Ok(Err(e)) => HttpResponse::InternalServerError().body(e),
        Err(join_err) => {
            HttpResponse::InternalServerError().body(format!("Task join error: {}", join_err))
        }
    }
}

fn resync_blocking(ctx: Arc<AppContext>, req: ResyncRequest) -> Result<ResyncReport, String> {
    let range = req.range.as_deref().unwrap_or(DEFAULT_RANGE);
    let grid = ctx
        .sheets
        .read_grid(&req.spreadsheet_id, range)
        .map_err(|e| format!("No se pudo leer la hoja de cálculo: {e}"))?;
    let (headers, data_rows) = rows::extract_rows(&grid);

    let snapshot = ctx
        .slides
        .snapshot(&req.presentation_id)
        .map_err(|e| e.to_string())?;

    let outcome = ResyncDiffer::diff(&snapshot, &headers, &data_rows, req.mode);
    if !outcome.operations.is_empty() {
        ctx.slides
            .apply_replacements(&req.presentation_id, &outcome.operations)
            .map_err(|e| e.to_string())?;
    }

    let applied = outcome.operations.len();
    info!(
        "resync {} ({}): {} operaciones sobre {} diapositivas",
        req.presentation_id,
        outcome.mode.as_str(),
        applied,
        outcome.slide_count
    );
    Ok(ResyncReport {
        operations_applied: applied,
        slide_count: outcome.slide_count,
        mode: outcome.mode,
        sincronizado: applied == 0,
    })
}
