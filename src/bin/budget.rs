use budget_optimizer_client::{
    presentation::{BudgetForm, Dashboard, DashboardSummary, DashboardView, Route},
    state::{OptimizationState, ProfileState, SessionState},
    BudgetApiClient, BudgetProfile, ClientConfig, FileTokenStore, LoginCredentials,
    OptimizationMode, OptimizationRequest, OptimizationResponse, RegisterData, ScenarioRequest,
};
use std::error::Error;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

type CliResult = Result<(), Box<dyn Error>>;

const USAGE: &str = "\
Usage: budget <command>

Commands:
  register <email>              Create an account and log in
  login <email>                 Log in
  logout                        Forget the stored session
  whoami                        Show the logged-in user
  profile show                  Print the stored budget profile
  profile template              Print a starter profile as JSON
  profile save <file.json>      Create or replace the budget profile
  optimize [mode] [goal_id]     Run the optimizer (max_savings | balanced | fastest_goal)
  scenario <file.json>          What-if analysis on ad hoc inputs
  history                       Past optimization results
  recommendations               Savings recommendations
  dashboard [mode]              Optimize and summarize

The password is read from BUDGET_PASSWORD or the first line of stdin.";

#[tokio::main]
async fn main() -> CliResult {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        println!("{}", USAGE);
        return Ok(());
    };

    let config = ClientConfig::from_env()?;
    info!("Budget API: {}", config.base_url);
    debug!("Token file: {}", config.token_file.display());

    let tokens = Arc::new(FileTokenStore::new(config.token_file.clone()));
    let client = Arc::new(BudgetApiClient::new(config, tokens)?);

    let rest = &args[1..];
    match (command.as_str(), rest) {
        ("register", [email]) => register(client, email).await,
        ("login", [email]) => login(client, email).await,
        ("logout", []) => {
            SessionState::new(client).logout().await;
            println!("Logged out.");
            Ok(())
        }
        ("whoami", []) => whoami(client).await,
        ("profile", [sub]) if sub == "show" => show_profile(client).await,
        ("profile", [sub]) if sub == "template" => {
            println!("{}", serde_json::to_string_pretty(&BudgetForm::new().to_profile())?);
            Ok(())
        }
        ("profile", [sub, path]) if sub == "save" => save_profile(client, path).await,
        ("optimize", opts) if opts.len() <= 2 => optimize(client, opts).await,
        ("scenario", [path]) => scenario(client, path).await,
        ("history", []) => history(client).await,
        ("recommendations", []) => recommendations(client).await,
        ("dashboard", opts) if opts.len() <= 1 => dashboard(client, opts.first()).await,
        _ => Err(format!("unrecognized command\n\n{}", USAGE).into()),
    }
}

// =============================
// Session
// =============================

async fn register(client: Arc<BudgetApiClient>, email: &str) -> CliResult {
    let data = RegisterData {
        email: email.to_string(),
        password: read_password().await?,
    };

    let session = SessionState::new(client);
    if session.register(&data).await {
        let snapshot = session.snapshot().await;
        println!("Registered and logged in as {}.", email_of(&snapshot));
        Ok(())
    } else {
        Err(failure(session.snapshot().await.error, false))
    }
}

async fn login(client: Arc<BudgetApiClient>, email: &str) -> CliResult {
    let credentials = LoginCredentials {
        email: email.to_string(),
        password: read_password().await?,
    };

    let session = SessionState::new(client);
    if session.login(&credentials).await {
        println!("Logged in as {}.", email_of(&session.snapshot().await));
        Ok(())
    } else {
        Err(failure(session.snapshot().await.error, false))
    }
}

async fn whoami(client: Arc<BudgetApiClient>) -> CliResult {
    let session = SessionState::new(client);
    session.initialize().await;
    let snapshot = session.snapshot().await;

    match (snapshot.user(), Route::after_session(&snapshot)) {
        (Some(user), _) => {
            println!("{} (id {}, since {})", user.email, user.id, user.created_at.date_naive());
            Ok(())
        }
        (None, Some(Route::Login)) => Err(failure(snapshot.error, true)),
        (None, _) => Err(failure(snapshot.error, false)),
    }
}

// =============================
// Profile
// =============================

async fn show_profile(client: Arc<BudgetApiClient>) -> CliResult {
    let profiles = ProfileState::load(client).await;
    let snapshot = profiles.snapshot().await;

    if let Some(profile) = &snapshot.profile {
        println!("{}", serde_json::to_string_pretty(profile)?);
        return Ok(());
    }
    if snapshot.needs_setup() {
        println!("No budget profile yet.");
        println!("Start from `budget profile template > budget.json`, edit it, then `budget profile save budget.json`.");
        return Ok(());
    }
    Err(failure(snapshot.error, snapshot.session_expired))
}

async fn save_profile(client: Arc<BudgetApiClient>, path: &str) -> CliResult {
    let raw = tokio::fs::read_to_string(path).await?;
    let profile: BudgetProfile = serde_json::from_str(&raw)?;

    let profiles = ProfileState::new(client);
    let mut form = BudgetForm::from_profile(&profile);

    match form.submit(&profiles).await {
        Some(_) => {
            let saved = profiles.snapshot().await.profile;
            let id = saved.and_then(|p| p.id).map_or("?".to_string(), |id| id.to_string());
            println!("Budget profile {} saved.", id);
            Ok(())
        }
        None => {
            let snapshot = profiles.snapshot().await;
            Err(failure(
                snapshot.error.or_else(|| form.error().map(str::to_string)),
                snapshot.session_expired,
            ))
        }
    }
}

// =============================
// Optimization
// =============================

async fn optimize(client: Arc<BudgetApiClient>, opts: &[String]) -> CliResult {
    let mode = parse_mode(opts.first())?;
    let request = match opts.get(1) {
        Some(goal) => OptimizationRequest::for_goal(mode, goal.parse()?),
        None => OptimizationRequest::new(mode),
    };

    let optimization = OptimizationState::new(client);
    match optimization.run(&request).await {
        Some(response) => {
            print_response(&response);
            Ok(())
        }
        None => {
            let snapshot = optimization.snapshot().await;
            Err(failure(snapshot.error, snapshot.session_expired))
        }
    }
}

async fn scenario(client: Arc<BudgetApiClient>, path: &str) -> CliResult {
    let raw = tokio::fs::read_to_string(path).await?;
    let request: ScenarioRequest = serde_json::from_str(&raw)?;

    let optimization = OptimizationState::new(client);
    match optimization.explore(&request).await {
        Some(response) => {
            print_response(&response);
            Ok(())
        }
        None => {
            let snapshot = optimization.snapshot().await;
            Err(failure(snapshot.error, snapshot.session_expired))
        }
    }
}

async fn history(client: Arc<BudgetApiClient>) -> CliResult {
    let optimization = OptimizationState::new(client);
    if !optimization.load_history().await {
        let snapshot = optimization.snapshot().await;
        return Err(failure(snapshot.error, snapshot.session_expired));
    }

    let runs = optimization.snapshot().await.history;
    if runs.is_empty() {
        println!("No optimization runs yet.");
    }
    for (i, run) in runs.iter().enumerate() {
        match run.as_optimal() {
            Some(plan) => println!(
                "{:>3}. optimal  savings ${:.2}/month, spending ${:.2}",
                i + 1,
                plan.monthly_savings,
                plan.total_monthly_spending
            ),
            None => println!("{:>3}. {}  {}", i + 1, run.status(), run.message().unwrap_or("")),
        }
    }
    Ok(())
}

async fn recommendations(client: Arc<BudgetApiClient>) -> CliResult {
    match client.get_recommendations().await {
        Ok(tips) => {
            for tip in tips {
                println!("- {}", tip);
            }
            Ok(())
        }
        Err(e) => Err(failure(Some(e.user_message("Failed to fetch recommendations")), e.is_unauthorized())),
    }
}

async fn dashboard(client: Arc<BudgetApiClient>, mode: Option<&String>) -> CliResult {
    let profiles = ProfileState::load(client.clone()).await;
    let optimization = OptimizationState::new(client.clone());

    let mut dashboard = Dashboard::new(client);
    dashboard.select_mode(parse_mode(mode)?);

    if profiles.snapshot().await.profile.is_some() {
        dashboard.optimize(&optimization).await;
    }

    match dashboard.view(&profiles.snapshot().await, &optimization.snapshot().await) {
        DashboardView::Ready(summary) => {
            print_summary(&summary);
            Ok(())
        }
        DashboardView::Infeasible { message } => {
            println!("Budget Not Feasible");
            println!("{}", message);
            println!("Update the profile with `budget profile save <file.json>`.");
            Ok(())
        }
        DashboardView::Redirect(Route::BudgetSetup) => {
            println!("No budget profile yet. Create one with `budget profile save <file.json>`.");
            Ok(())
        }
        DashboardView::Redirect(Route::Login) => Err(failure(None, true)),
        DashboardView::Failed { message } => Err(message.into()),
        DashboardView::Redirect(Route::Dashboard)
        | DashboardView::Loading
        | DashboardView::Optimizing
        | DashboardView::Empty => {
            println!("No optimization results available.");
            Ok(())
        }
    }
}

// =============================
// Output helpers
// =============================

fn print_response(response: &OptimizationResponse) {
    match response {
        OptimizationResponse::Optimal(plan) => {
            println!("Status: optimal");
            println!("Monthly savings:   ${:.2}", plan.monthly_savings);
            println!("Monthly spending:  ${:.2}", plan.total_monthly_spending);
            match plan.months_to_goal {
                Some(months) => println!("Months to goal:    {:.1}", months),
                None => println!("Months to goal:    N/A"),
            }
            println!("Allocation:");
            for (category, amount) in &plan.spending_allocation {
                println!("  {:<20} ${:.2}", category, amount);
            }
        }
        OptimizationResponse::Infeasible { message } => {
            println!("Status: infeasible");
            println!("{}", message.as_deref().unwrap_or("The budget cannot be balanced."));
        }
        OptimizationResponse::Error { message } => {
            println!("Status: error");
            println!("{}", message.as_deref().unwrap_or("The optimizer failed."));
        }
    }
}

fn print_summary(summary: &DashboardSummary) {
    println!("Budget Dashboard ({})", summary.mode);
    println!();
    println!("Monthly Income   ${:.2}", summary.monthly_income);
    println!("Total Expenses   ${:.2}", summary.total_spending);
    println!("Monthly Savings  ${:.2}", summary.monthly_savings);
    println!("Months to Goal   {}", summary.months_to_goal_label());

    println!();
    println!("Budget Allocation");
    for slice in &summary.allocation {
        println!("  {:<20} ${:.2}", slice.name, slice.value);
    }

    if let Some(last) = summary.projection.last() {
        println!();
        println!("Savings after {}: ${:.2}", last.label.to_lowercase(), last.savings);
    }

    if !summary.goals.is_empty() {
        println!();
        println!("Goals");
        for goal in &summary.goals {
            println!(
                "  {:<20} {:>5.1}%  (${:.2} of ${:.2})",
                goal.name, goal.progress, goal.current, goal.target
            );
        }
    }

    if !summary.recommendations.is_empty() {
        println!();
        println!("Recommendations");
        for tip in &summary.recommendations {
            println!("  - {}", tip);
        }
    }
}

fn email_of(snapshot: &budget_optimizer_client::state::SessionSnapshot) -> String {
    snapshot
        .user()
        .map(|u| u.email.clone())
        .unwrap_or_default()
}

fn parse_mode(raw: Option<&String>) -> Result<OptimizationMode, Box<dyn Error>> {
    match raw {
        Some(raw) => Ok(raw.parse::<OptimizationMode>()?),
        None => Ok(OptimizationMode::default()),
    }
}

fn failure(message: Option<String>, session_expired: bool) -> Box<dyn Error> {
    let message = message.unwrap_or_else(|| "Request failed".to_string());
    if session_expired {
        format!("{}\nSession expired, please log in with `budget login <email>`.", message).into()
    } else {
        message.into()
    }
}

async fn read_password() -> Result<String, Box<dyn Error>> {
    if let Ok(password) = std::env::var("BUDGET_PASSWORD") {
        return Ok(password);
    }

    eprint!("Password: ");
    let mut line = String::new();
    BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;

    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        return Err("a password is required".into());
    }
    Ok(password)
}
