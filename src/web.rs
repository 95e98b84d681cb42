use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

use actix_web::{middleware, web, App, HttpRequest, HttpResponse, HttpServer, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::StoreError;
use crate::roster::Roster;
use crate::schedule::{parse_month, usage_for_day, Location, Overrides};
use crate::store::{JsonStore, ScheduleState};
use crate::textfile::ExportVariant;

/// Shared server state: the static roster and the one mutable schedule.
pub struct AppState {
    pub roster: Roster,
    pub schedule: Mutex<ScheduleState>,
    pub store: JsonStore,
    pub admin_password: String,
}

impl AppState {
    pub fn new(roster: Roster, schedule: ScheduleState, store: JsonStore, admin_password: String) -> Self {
        Self {
            roster,
            schedule: Mutex::new(schedule),
            store,
            admin_password,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, ScheduleState>> {
        self.schedule
            .lock()
            .map_err(|_| actix_web::error::ErrorInternalServerError("schedule state is poisoned"))
    }

    fn is_admin(&self, req: &HttpRequest) -> bool {
        let password = req
            .headers()
            .get("X-Admin-Password")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        password == self.admin_password
    }
}

#[derive(Deserialize)]
pub struct LoginRequest {
    password: String,
}

#[derive(Deserialize)]
pub struct GenerateRequest {
    /// `YYYY-MM`
    month: String,
    #[serde(default)]
    all_hands: BTreeSet<NaiveDate>,
    #[serde(default)]
    absences: BTreeMap<String, BTreeSet<NaiveDate>>,
}

#[derive(Deserialize)]
pub struct CellUpdate {
    date: NaiveDate,
    person_id: String,
    location: Location,
}

#[derive(Deserialize)]
pub struct ExportQuery {
    #[serde(default)]
    absences: bool,
}

fn unauthorized() -> HttpResponse {
    HttpResponse::Unauthorized().json(serde_json::json!({"success": false, "error": "Unauthorized"}))
}

fn bad_request(message: impl Into<String>) -> HttpResponse {
    HttpResponse::BadRequest().json(serde_json::json!({"success": false, "error": message.into()}))
}

fn store_error(err: &StoreError) -> HttpResponse {
    match err {
        StoreError::Io(_) | StoreError::Json(_) | StoreError::Export(_) => {
            warn!(error = %err, "schedule state failure");
            HttpResponse::InternalServerError()
                .json(serde_json::json!({"success": false, "error": err.to_string()}))
        }
        _ => bad_request(err.to_string()),
    }
}

// Saves `next` and only then makes it the served schedule
fn commit(state: &AppState, schedule: &mut ScheduleState, next: ScheduleState) -> Option<HttpResponse> {
    if let Err(e) = state.store.save(&next) {
        return Some(store_error(&e));
    }
    *schedule = next;
    None
}

// Admin login endpoint
async fn admin_login(req: web::Json<LoginRequest>, state: web::Data<AppState>) -> Result<HttpResponse> {
    if req.password == state.admin_password {
        Ok(HttpResponse::Ok().json(serde_json::json!({"success": true})))
    } else {
        warn!("failed admin login");
        Ok(HttpResponse::Unauthorized().json(serde_json::json!({"success": false, "error": "Invalid password"})))
    }
}

async fn get_schedule(state: web::Data<AppState>) -> Result<HttpResponse> {
    let schedule = state.lock()?;
    Ok(HttpResponse::Ok().json(&*schedule))
}

async fn get_usage(date: web::Path<String>, state: web::Data<AppState>) -> Result<HttpResponse> {
    let Ok(day) = NaiveDate::parse_from_str(date.as_str(), "%Y-%m-%d") else {
        return Ok(bad_request(format!("invalid date: {}", date.as_str())));
    };

    let schedule = state.lock()?;
    if !schedule.business_days.contains(&day) {
        return Ok(HttpResponse::NotFound().json(serde_json::json!({"error": "Not a business day of the schedule"})));
    }
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "date": day,
        "all_hands": schedule.all_hands.contains(&day),
        "usage": usage_for_day(&schedule.table, day),
    })))
}

async fn get_summary(state: web::Data<AppState>) -> Result<HttpResponse> {
    let schedule = state.lock()?;
    Ok(HttpResponse::Ok().json(schedule.summary(&state.roster)))
}

async fn get_export(query: web::Query<ExportQuery>, state: web::Data<AppState>) -> Result<HttpResponse> {
    let variant = if query.absences {
        ExportVariant::WithAbsence
    } else {
        ExportVariant::Standard
    };

    let schedule = state.lock()?;
    match schedule.export(&state.roster, variant) {
        Ok(text) => Ok(HttpResponse::Ok().content_type("text/csv; charset=utf-8").body(text)),
        Err(e) => Ok(store_error(&e)),
    }
}

// Admin: new month and overrides, then a fresh table
async fn generate(
    req: HttpRequest,
    body: web::Json<GenerateRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    if !state.is_admin(&req) {
        return Ok(unauthorized());
    }
    let Some(month) = parse_month(&body.month) else {
        return Ok(bad_request(format!("invalid month: {}", body.month)));
    };
    let body = body.into_inner();
    let overrides = Overrides {
        all_hands: body.all_hands,
        absences: body.absences,
    };

    let mut schedule = state.lock()?;
    let mut next = schedule.clone();
    if let Err(e) = next.set_overrides(&state.roster, month, overrides) {
        return Ok(store_error(&e));
    }
    next.regenerate(&state.roster);
    let cells = next.table.cell_count();
    if let Some(response) = commit(&state, &mut schedule, next) {
        return Ok(response);
    }

    info!(month = %month.format("%Y-%m"), cells, "schedule regenerated");
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Schedule generated successfully",
        "cells": cells,
    })))
}

// Admin: manual edit of one cell
async fn update_cell(
    req: HttpRequest,
    body: web::Json<CellUpdate>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    if !state.is_admin(&req) {
        return Ok(unauthorized());
    }

    let mut schedule = state.lock()?;
    let mut next = schedule.clone();
    if let Err(e) = next.set_cell(&state.roster, body.date, &body.person_id, body.location) {
        return Ok(store_error(&e));
    }
    if let Some(response) = commit(&state, &mut schedule, next) {
        return Ok(response);
    }

    info!(date = %body.date, person = %body.person_id, location = %body.location, "cell updated");
    Ok(HttpResponse::Ok().json(serde_json::json!({"success": true})))
}

// Admin: upload of an edited export
async fn import(req: HttpRequest, body: web::Bytes, state: web::Data<AppState>) -> Result<HttpResponse> {
    if !state.is_admin(&req) {
        return Ok(unauthorized());
    }
    let Ok(text) = std::str::from_utf8(&body) else {
        return Ok(bad_request("upload is not valid UTF-8"));
    };

    let mut schedule = state.lock()?;
    let mut next = schedule.clone();
    let people = match next.apply_import(&state.roster, text) {
        Ok(people) => people,
        Err(e) => return Ok(store_error(&e)),
    };
    if let Some(response) = commit(&state, &mut schedule, next) {
        return Ok(response);
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": format!("Imported {} people", people),
    })))
}

/// Registers the API routes.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/login", web::post().to(admin_login))
        .route("/api/schedule", web::get().to(get_schedule))
        .route("/api/usage/{date}", web::get().to(get_usage))
        .route("/api/summary", web::get().to(get_summary))
        .route("/api/export", web::get().to(get_export))
        .route("/api/generate", web::post().to(generate))
        .route("/api/cell", web::put().to(update_cell))
        .route("/api/import", web::post().to(import));
}

pub async fn start_server(port: u16, state: AppState) -> std::io::Result<()> {
    let app_state = web::Data::new(state);
    info!(port, "starting web server");

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .wrap(middleware::Logger::default())
            .configure(routes)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
