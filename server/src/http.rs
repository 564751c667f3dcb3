use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{
    Json, Router,
    extract::State,
    http::{self, HeaderName, HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::get,
};
use platform_api::{ApiError, ApiJson, ApiPath, ApiQuery, ApiResult};
use platform_db::DbPool;
use products_hr::{
    DepartmentFilter, DepartmentPatch, DepartmentStore, DepartmentView, EmployeeFilter,
    EmployeePatch, EmployeeStore, EmployeeView, HrError, NewDepartment, NewEmployee,
};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::info;
use uuid::Uuid;

use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub employees: EmployeeStore,
    pub departments: DepartmentStore,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(pool: DbPool, config: Arc<AppConfig>) -> Self {
        Self {
            employees: EmployeeStore::new(pool.clone()),
            departments: DepartmentStore::new(pool.clone()),
            pool,
            config,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ServeConfig {
    addr: SocketAddr,
}

impl ServeConfig {
    pub fn new(addr: SocketAddr) -> Self {
        Self { addr }
    }
}

pub async fn serve(config: ServeConfig, state: AppState) -> anyhow::Result<()> {
    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;

    info!(%config.addr, "directory server listening");
    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;
    Ok(())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed = origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect::<Vec<_>>();
    let allow_origin = if allowed.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(allowed)
    };
    CorsLayer::new()
        .allow_headers([http::header::CONTENT_TYPE])
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_origin(allow_origin)
}

pub fn build_router(state: AppState) -> Router {
    let request_id = MakeRequestUuid;
    let header_name = HeaderName::from_static("x-request-id");
    let mut router = Router::new()
        .route("/health", get(health_handler))
        .route("/api/employees", get(list_employees).post(create_employee))
        .route(
            "/api/employees/{id}",
            get(get_employee)
                .put(update_employee)
                .delete(delete_employee),
        )
        .route(
            "/api/departments",
            get(list_departments).post(create_department),
        )
        .route(
            "/api/departments/{id}",
            get(get_department)
                .put(update_department)
                .delete(delete_department),
        );
    if let Some(dir) = &state.config.static_dir {
        router = router.fallback_service(ServeDir::new(dir));
    }
    router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(header_name.clone(), request_id))
                .layer(PropagateRequestIdLayer::new(header_name))
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&state.config.cors_allowed_origins)),
        )
        .with_state(state)
}

fn api_error(err: HrError) -> ApiError {
    match err {
        HrError::Validation { message } => ApiError::bad_request(message),
        HrError::MissingReference { .. } => ApiError::bad_request(err.to_string()),
        HrError::NotFound { .. } => ApiError::not_found(err.to_string()),
        HrError::Duplicate { .. } | HrError::StillReferenced { .. } => {
            ApiError::conflict(err.to_string())
        }
        HrError::Database(source) => ApiError::internal(source),
    }
}

#[derive(Serialize)]
struct DeleteResponse {
    message: &'static str,
}

async fn list_employees(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<EmployeeFilter>,
) -> ApiResult<Json<Vec<EmployeeView>>> {
    let employees = state.employees.list(filter).await.map_err(api_error)?;
    Ok(Json(employees))
}

async fn get_employee(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<EmployeeView>> {
    let employee = state.employees.get(id).await.map_err(api_error)?;
    Ok(Json(employee))
}

async fn create_employee(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<NewEmployee>,
) -> ApiResult<(StatusCode, Json<EmployeeView>)> {
    let employee = state.employees.create(input).await.map_err(api_error)?;
    Ok((StatusCode::CREATED, Json(employee)))
}

async fn update_employee(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(patch): ApiJson<EmployeePatch>,
) -> ApiResult<Json<EmployeeView>> {
    let employee = state.employees.update(id, patch).await.map_err(api_error)?;
    Ok(Json(employee))
}

async fn delete_employee(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<DeleteResponse>> {
    state.employees.delete(id).await.map_err(api_error)?;
    Ok(Json(DeleteResponse {
        message: "Employee deleted successfully",
    }))
}

async fn list_departments(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<DepartmentFilter>,
) -> ApiResult<Json<Vec<DepartmentView>>> {
    let departments = state.departments.list(filter).await.map_err(api_error)?;
    Ok(Json(departments))
}

async fn get_department(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<DepartmentView>> {
    let department = state.departments.get(id).await.map_err(api_error)?;
    Ok(Json(department))
}

async fn create_department(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<NewDepartment>,
) -> ApiResult<(StatusCode, Json<DepartmentView>)> {
    let department = state.departments.create(input).await.map_err(api_error)?;
    Ok((StatusCode::CREATED, Json(department)))
}

async fn update_department(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(patch): ApiJson<DepartmentPatch>,
) -> ApiResult<Json<DepartmentView>> {
    let department = state
        .departments
        .update(id, patch)
        .await
        .map_err(api_error)?;
    Ok(Json(department))
}

async fn delete_department(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<DeleteResponse>> {
    state.departments.delete(id).await.map_err(api_error)?;
    Ok(Json(DeleteResponse {
        message: "Department deleted successfully",
    }))
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let db_ok = platform_db::ping(&state.pool).await;
    Json(HealthResponse {
        ok: db_ok,
        db_ok,
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    ok: bool,
    db_ok: bool,
    version: &'static str,
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install CTRL+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        signal(SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    ctrl_c.await;

    #[cfg(unix)]
    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    };

    info!("shutdown signal received");
}
