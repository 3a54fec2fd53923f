//! HTTP routes over [`TableManager`].

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::HeaderValue,
    routing::{delete, get, post, put},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::bootstrap;
use crate::error::TableResult;
use crate::manager::TableManager;
use crate::models::{
    CreateTableRequest, CreateUserRequest, InitSystemResponse, InsertDataRequest,
    MessageResponse, TableInfoResponse, TableQuery, TablesResponse, UpdateOutcome,
    UpdateTableRequest, UsernameQuery,
};

#[derive(Debug, Clone)]
pub struct AppState {
    pub tables: TableManager,
}

pub fn router(state: Arc<AppState>, cors_origins: &[HeaderValue]) -> Router {
    Router::new()
        .route("/create_table", post(create_table))
        .route("/insert_data", post(insert_data))
        .route("/get_all_tables", get(get_all_tables))
        .route("/get_info_table", get(get_info_table))
        .route("/delete_table/:table_name", delete(delete_table))
        .route("/update_table", put(update_table))
        .route("/init-roles", post(init_roles))
        .route("/init-system", post(init_system))
        .route("/create-user", post(create_user))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_origins))
        .with_state(state)
}

/// Any origin when none are configured. Origins are validated in `Config`.
fn cors_layer(origins: &[HeaderValue]) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        cors.allow_origin(Any)
    } else {
        cors.allow_origin(origins.to_vec())
    }
}

async fn create_table(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateTableRequest>,
) -> TableResult<Json<MessageResponse>> {
    let message = state
        .tables
        .create_table(&req.table_name, &req.username)
        .await?;
    Ok(Json(MessageResponse { message }))
}

async fn insert_data(
    State(state): State<Arc<AppState>>,
    Json(req): Json<InsertDataRequest>,
) -> TableResult<Json<MessageResponse>> {
    let message = state
        .tables
        .insert_row(&req.table_name, &req.name, req.age, &req.username)
        .await?;
    Ok(Json(MessageResponse { message }))
}

async fn get_all_tables(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UsernameQuery>,
) -> TableResult<Json<TablesResponse>> {
    let tables = state.tables.list_tables(&query.username).await?;
    Ok(Json(TablesResponse { tables }))
}

async fn get_info_table(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TableQuery>,
) -> TableResult<Json<TableInfoResponse>> {
    let table_info = state
        .tables
        .read_table(&query.table_name, &query.username)
        .await?;
    Ok(Json(TableInfoResponse { table_info }))
}

async fn delete_table(
    State(state): State<Arc<AppState>>,
    Path(table_name): Path<String>,
    Query(query): Query<UsernameQuery>,
) -> TableResult<Json<MessageResponse>> {
    let message = state
        .tables
        .delete_table(&table_name, &query.username)
        .await?;
    Ok(Json(MessageResponse { message }))
}

async fn update_table(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UpdateTableRequest>,
) -> TableResult<Json<UpdateOutcome>> {
    let outcome = state.tables.update_table(&req, &req.username).await?;
    Ok(Json(outcome))
}

async fn init_roles(State(state): State<Arc<AppState>>) -> TableResult<Json<MessageResponse>> {
    let message = bootstrap::seed_roles(state.tables.pool()).await?;
    Ok(Json(MessageResponse { message }))
}

async fn init_system(
    State(state): State<Arc<AppState>>,
) -> TableResult<Json<InitSystemResponse>> {
    let details = bootstrap::init_system(state.tables.pool()).await?;
    Ok(Json(InitSystemResponse {
        message: "System initialized".into(),
        details,
    }))
}

async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateUserRequest>,
) -> TableResult<Json<MessageResponse>> {
    let message = bootstrap::create_user(state.tables.pool(), &req.username, &req.role).await?;
    Ok(Json(MessageResponse { message }))
}
