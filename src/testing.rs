//! In-process fake of the budget API for tests
//!
//! Serves the auth/budget/optimize routes from memory on an ephemeral port,
//! records every request, and lets tests inject failures.

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::client::BudgetApiClient;
use crate::config::ClientConfig;
use crate::models::{
    AuthResponse, BudgetProfile, HistoryEntry, IncomeAllocation, LoginCredentials, OptimalPlan,
    OptimizationRequest, OptimizationResponse, RegisterData, ScenarioRequest, User,
};
use crate::token::{InMemoryTokenStore, TokenStore};

pub const TEST_PASSWORD: &str = "correct-horse-battery";

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub body: Option<Value>,
}

#[derive(Default)]
struct FakeState {
    users: Vec<(User, String)>,
    tokens: HashMap<String, i64>,
    profiles: HashMap<i64, BudgetProfile>,
    history: HashMap<i64, Vec<HistoryEntry>>,
    requests: Vec<RecordedRequest>,
    next_id: i64,
    fail_login: bool,
    fail_recommendations: bool,
    canned_optimization: Option<OptimizationResponse>,
}

impl FakeState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn authorize(&self, headers: &HeaderMap) -> Result<i64, Response> {
        headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .and_then(|token| self.tokens.get(token).copied())
            .ok_or_else(|| detail(StatusCode::UNAUTHORIZED, "Could not validate credentials"))
    }
}

type Shared = Arc<Mutex<FakeState>>;

pub struct FakeBudgetServer {
    base_url: String,
    state: Shared,
}

impl FakeBudgetServer {
    pub async fn start() -> Self {
        let state: Shared = Arc::new(Mutex::new(FakeState::default()));

        let router = Router::new()
            .route("/api/auth/register", post(register))
            .route("/api/auth/login", post(login))
            .route("/api/auth/me", get(me))
            .route("/api/budget/", get(get_profile).post(save_profile))
            .route("/api/budget/history", get(history))
            .route("/api/optimize/", post(optimize))
            .route("/api/optimize/scenario", post(scenario))
            .route("/api/optimize/recommendations", get(recommendations))
            .layer(middleware::from_fn_with_state(state.clone(), record))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake server");
        let addr = listener.local_addr().expect("fake server address");

        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("fake server");
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
        }
    }

    pub fn config(&self) -> ClientConfig {
        ClientConfig::new(self.base_url.clone())
    }

    pub fn client(&self) -> BudgetApiClient {
        self.client_with_store(Arc::new(InMemoryTokenStore::new()))
    }

    pub fn client_with_store(&self, tokens: Arc<dyn TokenStore>) -> BudgetApiClient {
        BudgetApiClient::new(self.config(), tokens).expect("build client")
    }

    pub fn register_data(&self, email: &str) -> RegisterData {
        RegisterData {
            email: email.to_string(),
            password: TEST_PASSWORD.to_string(),
        }
    }

    pub fn credentials(&self, email: &str) -> LoginCredentials {
        self.register_data(email).credentials()
    }

    pub async fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().await.requests.clone()
    }

    pub async fn last_request_to(&self, path: &str) -> Option<RecordedRequest> {
        self.state
            .lock()
            .await
            .requests
            .iter()
            .rev()
            .find(|r| r.path == path)
            .cloned()
    }

    pub async fn revoke_all_tokens(&self) {
        self.state.lock().await.tokens.clear();
    }

    pub async fn fail_login(&self, fail: bool) {
        self.state.lock().await.fail_login = fail;
    }

    pub async fn fail_recommendations(&self, fail: bool) {
        self.state.lock().await.fail_recommendations = fail;
    }

    pub async fn respond_to_optimize_with(&self, response: OptimizationResponse) {
        self.state.lock().await.canned_optimization = Some(response);
    }
}

fn detail(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "detail": message }))).into_response()
}

async fn record(State(state): State<Shared>, request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap_or_default();

    let recorded = RecordedRequest {
        method: parts.method.to_string(),
        path: parts.uri.path().to_string(),
        authorization: parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body: serde_json::from_slice(&bytes).ok(),
    };
    state.lock().await.requests.push(recorded);

    next.run(Request::from_parts(parts, Body::from(bytes))).await
}

async fn register(State(state): State<Shared>, Json(data): Json<RegisterData>) -> Response {
    let mut state = state.lock().await;

    if state.users.iter().any(|(u, _)| u.email == data.email) {
        return detail(StatusCode::BAD_REQUEST, "Email already registered");
    }

    let user = User {
        id: state.next_id(),
        email: data.email,
        created_at: Utc::now(),
    };
    state.users.push((user.clone(), data.password));

    (StatusCode::CREATED, Json(user)).into_response()
}

async fn login(State(state): State<Shared>, Json(creds): Json<LoginCredentials>) -> Response {
    let mut state = state.lock().await;

    if state.fail_login {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    let user_id = state
        .users
        .iter()
        .find(|(u, password)| u.email == creds.email && *password == creds.password)
        .map(|(u, _)| u.id);

    let Some(user_id) = user_id else {
        return detail(StatusCode::UNAUTHORIZED, "Incorrect email or password");
    };

    let token = format!("token-{}-{}", user_id, state.next_id());
    state.tokens.insert(token.clone(), user_id);

    Json(AuthResponse {
        access_token: token,
        token_type: "bearer".to_string(),
    })
    .into_response()
}

async fn me(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let state = state.lock().await;
    let user_id = match state.authorize(&headers) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match state.users.iter().find(|(u, _)| u.id == user_id) {
        Some((user, _)) => Json(user.clone()).into_response(),
        None => detail(StatusCode::UNAUTHORIZED, "User not found"),
    }
}

async fn get_profile(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let state = state.lock().await;
    let user_id = match state.authorize(&headers) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match state.profiles.get(&user_id) {
        Some(profile) => Json(profile.clone()).into_response(),
        None => detail(StatusCode::NOT_FOUND, "Budget profile not found"),
    }
}

async fn save_profile(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(incoming): Json<BudgetProfile>,
) -> Response {
    let mut state = state.lock().await;
    let user_id = match state.authorize(&headers) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let now = Utc::now();
    let existing = state
        .profiles
        .get(&user_id)
        .map(|p| (p.id.unwrap_or_default(), p.created_at));
    let (profile_id, created_at) = match existing {
        Some(ids) => ids,
        None => (state.next_id(), Some(now)),
    };

    let mut saved = incoming.without_server_fields();
    saved.id = Some(profile_id);
    saved.user_id = Some(user_id);
    saved.created_at = created_at;
    saved.updated_at = Some(now);
    for i in 0..saved.fixed_expenses.len() {
        let id = state.next_id();
        saved.fixed_expenses[i].id = Some(id);
        saved.fixed_expenses[i].profile_id = Some(profile_id);
    }
    for i in 0..saved.variable_expenses.len() {
        let id = state.next_id();
        saved.variable_expenses[i].id = Some(id);
        saved.variable_expenses[i].profile_id = Some(profile_id);
    }
    for i in 0..saved.financial_goals.len() {
        let id = state.next_id();
        saved.financial_goals[i].id = Some(id);
        saved.financial_goals[i].profile_id = Some(profile_id);
    }

    state.profiles.insert(user_id, saved.clone());
    (StatusCode::CREATED, Json(saved)).into_response()
}

async fn history(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let state = state.lock().await;
    let user_id = match state.authorize(&headers) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    if !state.profiles.contains_key(&user_id) {
        return detail(StatusCode::NOT_FOUND, "Budget profile not found");
    }

    // newest first, at most ten
    let entries: Vec<HistoryEntry> = state
        .history
        .get(&user_id)
        .map(|h| h.iter().rev().take(10).cloned().collect())
        .unwrap_or_default();
    Json(entries).into_response()
}

async fn optimize(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(request): Json<OptimizationRequest>,
) -> Response {
    let mut state = state.lock().await;
    let user_id = match state.authorize(&headers) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let Some(profile) = state.profiles.get(&user_id).cloned() else {
        return detail(
            StatusCode::NOT_FOUND,
            "Budget profile not found. Please create one first.",
        );
    };

    let result = match state.canned_optimization.clone() {
        Some(canned) => canned,
        None => {
            let scenario = ScenarioRequest::from_profile(
                &profile,
                request.optimization_mode,
                Utc::now().date_naive(),
            );
            allocate_minimums(&scenario)
        }
    };

    if result.is_optimal() {
        let entry = HistoryEntry {
            id: Some(state.next_id()),
            profile_id: profile.id,
            result_json: result.clone(),
            created_at: Some(Utc::now()),
        };
        state.history.entry(user_id).or_default().push(entry);
    }

    Json(result).into_response()
}

async fn scenario(State(state): State<Shared>, Json(request): Json<ScenarioRequest>) -> Response {
    let state = state.lock().await;
    let result = state
        .canned_optimization
        .clone()
        .unwrap_or_else(|| allocate_minimums(&request));
    Json(result).into_response()
}

async fn recommendations(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let state = state.lock().await;
    let user_id = match state.authorize(&headers) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    if !state.profiles.contains_key(&user_id) {
        return detail(StatusCode::NOT_FOUND, "Budget profile not found");
    }

    if state.fail_recommendations {
        return detail(StatusCode::INTERNAL_SERVER_ERROR, "Recommendation engine unavailable");
    }

    let tips = if state.history.get(&user_id).map_or(true, |h| h.is_empty()) {
        vec!["Run an optimization first to get personalized recommendations!".to_string()]
    } else {
        vec!["Your budget looks well-optimized!".to_string()]
    };
    Json(tips).into_response()
}

/// Stand-in result: every variable category at its minimum, the rest saved.
fn allocate_minimums(request: &ScenarioRequest) -> OptimizationResponse {
    let fixed: f64 = request.fixed_expenses.values().sum();
    let allocation: BTreeMap<String, f64> = request
        .variable_categories
        .iter()
        .map(|(category, (min, _))| (category.clone(), *min))
        .collect();
    let variable: f64 = allocation.values().sum();
    let savings = request.monthly_income - fixed - variable;

    if savings < 0.0 {
        return OptimizationResponse::Infeasible {
            message: Some(format!("Monthly shortfall: ${:.2}.", -savings)),
        };
    }

    let months_to_goal = (savings > 0.0 && request.savings_goal > 0.0)
        .then(|| request.savings_goal / savings);

    OptimizationResponse::Optimal(OptimalPlan {
        message: Some("Successfully optimized budget allocation".to_string()),
        monthly_savings: savings,
        spending_allocation: allocation,
        total_monthly_spending: fixed + variable,
        months_to_goal,
        projected_savings: (1..=request.months_to_goal)
            .map(|m| savings * m as f64)
            .collect(),
        fixed_expenses: request.fixed_expenses.clone(),
        total_fixed_expenses: Some(fixed),
        income_allocation: Some(IncomeAllocation {
            fixed_expenses: fixed,
            variable_expenses: variable,
            savings,
        }),
    })
}
