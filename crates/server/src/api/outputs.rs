//! Operator/machine directory and prediction history listings.
//!
//! Read-only views over the same PostgreSQL database the poller reconciles.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

use super::{bad_request, internal_error, ApiResult};

/// Rows returned by `/history` before reversal.
const HISTORY_LIMIT: i64 = 100;

// ── Operators ────────────────────────────────────────────────────

#[derive(Serialize, utoipa::ToSchema)]
pub struct MachineSummary {
    pub machine_id: i64,
    pub machine_name: Option<String>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct OperatorSummary {
    pub operator_id: i64,
    pub name: Option<String>,
    pub machines: Vec<MachineSummary>,
}

/// Operators with their machines, both ordered by id.
#[utoipa::path(
    get,
    path = "/operators",
    tag = "Outputs",
    responses(
        (status = 200, description = "Operators and their machines", body = Vec<OperatorSummary>),
        (status = 500, description = "Database error", body = super::ErrorResponse)
    )
)]
pub async fn operators(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<OperatorSummary>>> {
    let operators: Vec<(i64, Option<String>)> = sqlx::query_as(
        "SELECT operator_id::bigint, operator_name::text FROM operators ORDER BY operator_id ASC",
    )
    .fetch_all(&state.pg_pool)
    .await
    .map_err(internal_error)?;

    let machines: Vec<(i64, i64, Option<String>)> = sqlx::query_as(
        "SELECT operator_id::bigint, machine_id::bigint, machine_name::text \
         FROM machines \
         ORDER BY operator_id ASC, machine_id ASC",
    )
    .fetch_all(&state.pg_pool)
    .await
    .map_err(internal_error)?;

    Ok(Json(group_machines(operators, machines)))
}

fn group_machines(
    operators: Vec<(i64, Option<String>)>,
    machines: Vec<(i64, i64, Option<String>)>,
) -> Vec<OperatorSummary> {
    let mut by_operator: BTreeMap<i64, Vec<MachineSummary>> = BTreeMap::new();
    for (operator_id, machine_id, machine_name) in machines {
        by_operator.entry(operator_id).or_default().push(MachineSummary {
            machine_id,
            machine_name,
        });
    }

    operators
        .into_iter()
        .map(|(operator_id, name)| OperatorSummary {
            operator_id,
            name,
            machines: by_operator.remove(&operator_id).unwrap_or_default(),
        })
        .collect()
}

// ── History ──────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct HistoryParams {
    /// Restrict to machines owned by this operator. Empty means no filter.
    pub operator_id: Option<String>,
    /// Restrict to one machine. Empty means no filter.
    pub machine_id: Option<String>,
}

#[derive(Debug, Serialize, sqlx::FromRow, utoipa::ToSchema)]
pub struct OutputRow {
    pub machine_id: i64,
    pub cycle_id: i64,
    #[schema(value_type = Option<String>, format = DateTime)]
    pub start_time: Option<DateTime<Utc>>,
    pub cooler: Option<f64>,
    pub valve: Option<f64>,
    pub pump: Option<f64>,
    pub accumulator: Option<f64>,
}

/// Latest computed outputs, optionally filtered by operator and machine.
///
/// Selects up to 100 rows ordered by machine ascending then start time
/// descending, and returns them in reverse of that order.
#[utoipa::path(
    get,
    path = "/history",
    tag = "Outputs",
    params(HistoryParams),
    responses(
        (status = 200, description = "Output history", body = Vec<OutputRow>),
        (status = 400, description = "Non-numeric filter", body = super::ErrorResponse),
        (status = 500, description = "Database error", body = super::ErrorResponse)
    )
)]
pub async fn history(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HistoryParams>,
) -> ApiResult<Json<Vec<OutputRow>>> {
    let operator_id = parse_filter("operator_id", params.operator_id.as_deref())?;
    let machine_id = parse_filter("machine_id", params.machine_id.as_deref())?;

    // Table name is validated as a plain identifier at config load.
    let sql = format!(
        "SELECT mo.machine_id::bigint AS machine_id, \
                mo.cycle_id::bigint AS cycle_id, \
                mo.start_time::timestamptz AS start_time, \
                mo.output1::float8 AS cooler, \
                mo.output2::float8 AS valve, \
                mo.output3::float8 AS pump, \
                mo.output4::float8 AS accumulator \
         FROM {output} mo \
         JOIN machines m ON mo.machine_id = m.machine_id \
         WHERE ($1::bigint IS NULL OR m.operator_id = $1) \
           AND ($2::bigint IS NULL OR mo.machine_id = $2) \
         ORDER BY mo.machine_id ASC, mo.start_time DESC \
         LIMIT $3",
        output = state.config.poller.output_table,
    );

    let mut rows: Vec<OutputRow> = sqlx::query_as(&sql)
        .bind(operator_id)
        .bind(machine_id)
        .bind(HISTORY_LIMIT)
        .fetch_all(&state.pg_pool)
        .await
        .map_err(internal_error)?;

    rows.reverse();
    Ok(Json(rows))
}

/// Missing and empty filters both mean "no filter".
fn parse_filter(name: &str, raw: Option<&str>) -> ApiResult<Option<i64>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value
            .parse::<i64>()
            .map(Some)
            .map_err(|_| bad_request(format!("{name} must be an integer, got '{value}'"))),
    }
}
