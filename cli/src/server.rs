use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Path, Query, Request, State},
    http::{HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use fittrack_core::error::TrackerError;
use fittrack_core::estimator::{BmiAssessment, BodyMetrics};
use fittrack_core::models::{
    DailyReport, FoodItem, GoalTargets, MealEntry, MealSource, MealUpdate, NewFoodItem, UserGoal,
    parse_date,
};
use fittrack_core::service::TrackerService;

const BODY_LIMIT: usize = 1024 * 1024; // 1 MB

#[derive(Clone)]
struct AppState {
    svc: Arc<Mutex<TrackerService>>,
}

impl AppState {
    fn service(&self) -> MutexGuard<'_, TrackerService> {
        self.svc
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

// --- Request / Response types ---

#[derive(Deserialize)]
struct FoodSearchQuery {
    search: Option<String>,
}

#[derive(Deserialize)]
struct UserDateQuery {
    user_id: Option<String>,
    date: Option<String>,
}

#[derive(Deserialize)]
struct CreateFoodRequest {
    name: String,
    serving_size: Option<String>,
    calories: i64,
    #[serde(default)]
    carbs: f64,
    #[serde(default)]
    protein: f64,
    #[serde(default)]
    fat: f64,
}

#[derive(Deserialize)]
struct CreateMealRequest {
    user_id: Option<String>,
    food_id: Option<i64>,
    custom_name: Option<String>,
    servings: Option<f64>,
    meal_type: Option<String>,
    date: Option<String>,
}

#[derive(Deserialize)]
struct UpdateMealRequest {
    servings: Option<f64>,
    meal_type: Option<String>,
    date: Option<String>,
}

#[derive(Deserialize)]
struct SetGoalRequest {
    user_id: Option<String>,
    #[serde(flatten)]
    targets: GoalTargets,
}

/// Form fields may arrive as JSON numbers or as the raw text typed by the user.
#[derive(Deserialize)]
#[serde(untagged)]
enum Measurement {
    Number(f64),
    Text(String),
}

impl Measurement {
    fn value(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

#[derive(Deserialize)]
struct BmiRequest {
    weight: Option<Measurement>,
    height: Option<Measurement>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Serialize)]
struct DeleteResponse {
    success: bool,
}

// --- Error handling ---

enum ApiError {
    NotFound(String),
    BadRequest(String),
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Internal(err) => {
                error!("Internal server error: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<TrackerError> for ApiError {
    fn from(err: TrackerError) -> Self {
        match err {
            TrackerError::MissingParameter(_) => Self::BadRequest(err.to_string()),
            TrackerError::InvalidInput(msg) => Self::BadRequest(msg),
            TrackerError::NotFound(msg) => Self::NotFound(msg),
            TrackerError::StorageFailure(err) => Self::Internal(err),
        }
    }
}

/// Blank or absent dates mean the server's local today.
fn resolve_date(date: Option<&str>) -> Result<NaiveDate, ApiError> {
    match date.map(str::trim) {
        Some(d) if !d.is_empty() => Ok(parse_date(d)?),
        _ => Ok(Local::now().date_naive()),
    }
}

fn require_user(user_id: Option<&str>) -> Result<&str, ApiError> {
    Ok(fittrack_core::error::require_param(user_id, "user_id")?)
}

// --- Middleware ---

async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    response
}

// --- Handlers ---

async fn health() -> &'static str {
    "Fitness Tracker API"
}

async fn search_foods(
    State(state): State<AppState>,
    Query(params): Query<FoodSearchQuery>,
) -> Result<Json<Vec<FoodItem>>, ApiError> {
    let foods = state.service().search_foods(params.search.as_deref())?;
    Ok(Json(foods))
}

async fn create_food(
    State(state): State<AppState>,
    Json(req): Json<CreateFoodRequest>,
) -> Result<(StatusCode, Json<FoodItem>), ApiError> {
    let food = state.service().add_food(&NewFoodItem {
        name: req.name,
        serving_size: req.serving_size.filter(|s| !s.trim().is_empty()),
        calories: req.calories,
        carbs: req.carbs,
        protein: req.protein,
        fat: req.fat,
    })?;
    Ok((StatusCode::CREATED, Json(food)))
}

async fn list_meals(
    State(state): State<AppState>,
    Query(params): Query<UserDateQuery>,
) -> Result<Json<Vec<MealEntry>>, ApiError> {
    let user_id = require_user(params.user_id.as_deref())?;
    let date = resolve_date(params.date.as_deref())?;
    let meals = state.service().list_meals(user_id, date)?;
    Ok(Json(meals))
}

async fn create_meal(
    State(state): State<AppState>,
    Json(req): Json<CreateMealRequest>,
) -> Result<(StatusCode, Json<MealEntry>), ApiError> {
    let user_id = require_user(req.user_id.as_deref())?;
    let meal_type = req
        .meal_type
        .as_deref()
        .ok_or(TrackerError::MissingParameter("meal_type"))?;
    let source = MealSource::from_parts(req.food_id, req.custom_name.as_deref())?;
    let date = resolve_date(req.date.as_deref())?;

    let entry = state
        .service()
        .create_meal(user_id, source, req.servings, meal_type, date)?;
    Ok((StatusCode::CREATED, Json(entry)))
}

async fn update_meal(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateMealRequest>,
) -> Result<Json<MealEntry>, ApiError> {
    let date = req.date.as_deref().map(parse_date).transpose()?;
    let update = MealUpdate {
        servings: req.servings,
        meal_type: req.meal_type,
        date,
    };
    let entry = state.service().update_meal(id, &update)?;
    Ok(Json(entry))
}

async fn delete_meal(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<DeleteResponse>, ApiError> {
    state.service().delete_meal(id)?;
    Ok(Json(DeleteResponse { success: true }))
}

async fn daily_report(
    State(state): State<AppState>,
    Query(params): Query<UserDateQuery>,
) -> Result<Json<DailyReport>, ApiError> {
    let user_id = require_user(params.user_id.as_deref())?;
    let date = resolve_date(params.date.as_deref())?;
    let report = state.service().daily_report(user_id, date)?;
    Ok(Json(report))
}

async fn get_goal(
    State(state): State<AppState>,
    Query(params): Query<UserDateQuery>,
) -> Result<Json<Option<UserGoal>>, ApiError> {
    let user_id = require_user(params.user_id.as_deref())?;
    let goal = state.service().get_goal(user_id)?;
    Ok(Json(goal))
}

async fn set_goal(
    State(state): State<AppState>,
    Json(req): Json<SetGoalRequest>,
) -> Result<Json<UserGoal>, ApiError> {
    let user_id = require_user(req.user_id.as_deref())?;
    let goal = state.service().set_goal(user_id, &req.targets)?;
    Ok(Json(goal))
}

async fn estimate_bmi(Json(req): Json<BmiRequest>) -> Result<Json<BmiAssessment>, ApiError> {
    let read = |m: Option<&Measurement>| m.and_then(Measurement::value).unwrap_or(f64::NAN);
    let metrics = BodyMetrics::new(read(req.weight.as_ref()), read(req.height.as_ref()))?;
    Ok(Json(metrics.assess()))
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/foods", get(search_foods).post(create_food))
        .route("/meals", get(list_meals).post(create_meal))
        .route("/meals/{id}", put(update_meal).delete(delete_meal))
        .route("/reports/daily", get(daily_report))
        .route("/goals", get(get_goal).post(set_goal))
        .route("/bmi", post(estimate_bmi))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .layer(middleware::from_fn(security_headers))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// --- Server startup ---

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to listen for shutdown signal: {e}");
    }
    info!("shutting down");
}

pub async fn start_server(svc: TrackerService, port: u16, bind: &str) -> anyhow::Result<()> {
    let state = AppState {
        svc: Arc::new(Mutex::new(svc)),
    };
    let app = build_router(state);

    let addr = format!("{bind}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Listening on http://{addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn test_state() -> AppState {
        AppState {
            svc: Arc::new(Mutex::new(TrackerService::new_in_memory().unwrap())),
        }
    }

    async fn send(
        app: Router,
        request: axum::http::Request<Body>,
    ) -> (StatusCode, serde_json::Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    fn get_req(uri: &str) -> axum::http::Request<Body> {
        axum::http::Request::get(uri).body(Body::empty()).unwrap()
    }

    fn json_req(method: &str, uri: &str, body: &serde_json::Value) -> axum::http::Request<Body> {
        axum::http::Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn seed_food(state: &AppState) -> i64 {
        let (status, json) = send(
            build_router(state.clone()),
            json_req(
                "POST",
                "/foods",
                &serde_json::json!({
                    "name": "Granola",
                    "serving_size": "1/2 cup",
                    "calories": 100,
                    "carbs": 20,
                    "protein": 5,
                    "fat": 2
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        json["id"].as_i64().unwrap()
    }

    #[tokio::test]
    async fn health_check_responds() {
        let response = build_router(test_state())
            .oneshot(get_req("/"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"Fitness Tracker API");
    }

    #[tokio::test]
    async fn security_headers_present() {
        let response = build_router(test_state())
            .oneshot(get_req("/"))
            .await
            .unwrap();
        assert_eq!(
            response.headers().get("x-content-type-options").unwrap(),
            "nosniff"
        );
        assert_eq!(response.headers().get("x-frame-options").unwrap(), "DENY");
    }

    #[tokio::test]
    async fn log_meal_then_daily_report() {
        let state = test_state();
        let food_id = seed_food(&state).await;

        let (status, meal) = send(
            build_router(state.clone()),
            json_req(
                "POST",
                "/meals",
                &serde_json::json!({
                    "user_id": "u1",
                    "food_id": food_id,
                    "servings": 2,
                    "meal_type": "lunch",
                    "date": "2024-01-01"
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(meal["calories"], 200);
        assert_eq!(meal["carbs"], 40.0);
        assert_eq!(meal["protein"], 10.0);
        assert_eq!(meal["fat"], 4.0);
        assert_eq!(meal["source"]["kind"], "food");

        let (status, report) = send(
            build_router(state.clone()),
            get_req("/reports/daily?user_id=u1&date=2024-01-01"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["totals"]["total_calories"], 200);
        assert_eq!(report["totals"]["total_carbs"], 40.0);
        assert_eq!(report["goal"], serde_json::Value::Null);
        let breakdown = report["breakdown"].as_array().unwrap();
        assert_eq!(breakdown.len(), 1);
        assert_eq!(breakdown[0]["meal_type"], "lunch");
        assert_eq!(breakdown[0]["calories"], 200);

        let (status, meals) = send(
            build_router(state),
            get_req("/meals?user_id=u1&date=2024-01-01"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(meals.as_array().unwrap().len(), 1);
        assert_eq!(meals[0]["food_name"], "Granola");
    }

    #[tokio::test]
    async fn custom_meal_has_null_nutrition() {
        let state = test_state();
        let (status, meal) = send(
            build_router(state),
            json_req(
                "POST",
                "/meals",
                &serde_json::json!({
                    "user_id": "u1",
                    "custom_name": "Pho",
                    "meal_type": "dinner",
                    "date": "2024-01-01"
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(meal["calories"], serde_json::Value::Null);
        assert_eq!(meal["source"]["kind"], "custom");
        assert_eq!(meal["source"]["name"], "Pho");
        assert_eq!(meal["servings"], 1.0);
    }

    #[tokio::test]
    async fn create_meal_unknown_food_returns_404() {
        let state = test_state();
        let (status, json) = send(
            build_router(state.clone()),
            json_req(
                "POST",
                "/meals",
                &serde_json::json!({
                    "user_id": "u1",
                    "food_id": 4242,
                    "meal_type": "lunch",
                    "date": "2024-01-01"
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(json["error"].as_str().unwrap().contains("not found"));

        let (_, meals) = send(
            build_router(state),
            get_req("/meals?user_id=u1&date=2024-01-01"),
        )
        .await;
        assert!(meals.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_meal_bad_input_returns_400() {
        let state = test_state();
        let food_id = seed_food(&state).await;

        for body in [
            serde_json::json!({"food_id": food_id, "meal_type": "lunch"}),
            serde_json::json!({"user_id": "u1", "food_id": food_id}),
            serde_json::json!({"user_id": "u1", "meal_type": "lunch"}),
            serde_json::json!({"user_id": "u1", "food_id": food_id, "meal_type": "brunch"}),
            serde_json::json!({
                "user_id": "u1",
                "food_id": food_id,
                "meal_type": "lunch",
                "date": "01/02/2024"
            }),
        ] {
            let (status, json) =
                send(build_router(state.clone()), json_req("POST", "/meals", &body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "body: {body}");
            assert!(json["error"].is_string());
        }
    }

    #[tokio::test]
    async fn list_meals_requires_user() {
        let (status, json) = send(build_router(test_state()), get_req("/meals")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "user_id is required");

        let (status, _) = send(
            build_router(test_state()),
            get_req("/reports/daily?user_id="),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn report_defaults_to_today() {
        let (status, json) = send(
            build_router(test_state()),
            get_req("/reports/daily?user_id=u1"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let today = Local::now().date_naive().format("%Y-%m-%d").to_string();
        assert_eq!(json["date"], today);
        assert_eq!(json["totals"]["total_calories"], 0);
    }

    #[tokio::test]
    async fn update_and_delete_meal() {
        let state = test_state();
        let food_id = seed_food(&state).await;
        let (_, meal) = send(
            build_router(state.clone()),
            json_req(
                "POST",
                "/meals",
                &serde_json::json!({
                    "user_id": "u1",
                    "food_id": food_id,
                    "meal_type": "breakfast",
                    "date": "2024-01-01"
                }),
            ),
        )
        .await;
        let id = meal["id"].as_i64().unwrap();

        let (status, updated) = send(
            build_router(state.clone()),
            json_req(
                "PUT",
                &format!("/meals/{id}"),
                &serde_json::json!({"servings": 3, "meal_type": "snack"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["calories"], 300);
        assert_eq!(updated["meal_type"], "snack");

        let (status, _) = send(
            build_router(state.clone()),
            json_req("PUT", &format!("/meals/{id}"), &serde_json::json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let delete = axum::http::Request::delete(format!("/meals/{id}"))
            .body(Body::empty())
            .unwrap();
        let (status, json) = send(build_router(state.clone()), delete).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);

        let delete = axum::http::Request::delete(format!("/meals/{id}"))
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(build_router(state), delete).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn goals_round_trip() {
        let state = test_state();

        let (status, json) = send(build_router(state.clone()), get_req("/goals?user_id=u1")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, serde_json::Value::Null);

        let body = serde_json::json!({
            "user_id": "u1",
            "daily_calories": 2000,
            "daily_carbs": 250,
            "daily_protein": 150,
            "daily_fat": 65
        });
        for _ in 0..2 {
            let (status, _) =
                send(build_router(state.clone()), json_req("POST", "/goals", &body)).await;
            assert_eq!(status, StatusCode::OK);
        }

        let (_, goal) = send(build_router(state.clone()), get_req("/goals?user_id=u1")).await;
        assert_eq!(goal["daily_calories"], 2000);
        assert_eq!(goal["daily_carbs"], 250.0);
        assert_eq!(goal["daily_fat"], 65.0);

        let (_, report) = send(
            build_router(state),
            get_req("/reports/daily?user_id=u1&date=2024-01-01"),
        )
        .await;
        assert_eq!(report["goal"]["daily_calories"], 2000);
        assert_eq!(report["progress"]["calories"]["percent"], 0);
        assert_eq!(report["progress"]["calories"]["level"], "low");
    }

    #[tokio::test]
    async fn set_goal_requires_user() {
        let (status, _) = send(
            build_router(test_state()),
            json_req("POST", "/goals", &serde_json::json!({"daily_calories": 1800})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn food_search() {
        let state = test_state();
        seed_food(&state).await;

        let (status, foods) =
            send(build_router(state.clone()), get_req("/foods?search=gran")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(foods.as_array().unwrap().len(), 1);
        assert_eq!(foods[0]["serving_size"], "1/2 cup");

        let (_, foods) = send(build_router(state), get_req("/foods?search=tofu")).await;
        assert!(foods.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn bmi_estimate() {
        let (status, json) = send(
            build_router(test_state()),
            json_req("POST", "/bmi", &serde_json::json!({"weight": 70, "height": "70"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["bmi"], 22.1);
        assert_eq!(json["category"], "normal");
        assert_eq!(json["target_calories"], 2583);
        assert_eq!(json["recommendation"]["title"], "Maintenance Recommendation");
    }

    #[tokio::test]
    async fn bmi_rejects_bad_input() {
        for body in [
            serde_json::json!({"weight": 0, "height": 70}),
            serde_json::json!({"weight": 70}),
            serde_json::json!({"weight": "heavy", "height": 70}),
        ] {
            let (status, json) =
                send(build_router(test_state()), json_req("POST", "/bmi", &body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "body: {body}");
            assert!(json["error"].as_str().unwrap().starts_with("Please enter"));
        }
    }
}
