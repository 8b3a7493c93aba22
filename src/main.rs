use std::sync::Arc;

use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use collegesecracy::config::Config;
use collegesecracy::db::{create_pool, init_db, queries, AppState};
use collegesecracy::gateway::{DevGateway, PaymentGateway, RazorpayClient};
use collegesecracy::handlers;
use collegesecracy::mailer::EmailService;
use collegesecracy::models::{CouponScope, CreateCoupon, CreatePlan, CreateUser, PlanType};

#[derive(Parser, Debug)]
#[command(name = "collegesecracy")]
#[command(about = "Payments and entitlements backend for the CollegeSecracy counselling platform")]
struct Cli {
    /// Seed the database with dev data (user, plans, coupon)
    #[arg(long)]
    seed: bool,
}

/// Seeds the database with dev data for local testing.
/// Creates: a user, a counselling plan, a tool plan, and a coupon.
fn seed_dev_data(state: &AppState) {
    let conn = state.db.get().expect("Failed to get db connection for seeding");

    let existing: i64 = conn
        .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
        .expect("Failed to count users");
    if existing > 0 {
        tracing::info!("Database already has data, skipping seed");
        return;
    }

    tracing::info!("============================================");
    tracing::info!("SEEDING DEV DATA");
    tracing::info!("============================================");

    let (user, token) = queries::create_user(
        &conn,
        &CreateUser {
            email: "dev@collegesecracy.local".to_string(),
            name: "Dev Student".to_string(),
            contact: Some("+919999999999".to_string()),
        },
    )
    .expect("Failed to create dev user");

    let now = chrono::Utc::now().timestamp();

    let counselling = queries::create_plan(
        &conn,
        &CreatePlan {
            title: "JoSAA Counselling 2026".to_string(),
            price: 500,
            plan_type: PlanType::Counselling,
            expiry_date: Some(now + 90 * 86400),
            link: None,
        },
    )
    .expect("Failed to create counselling plan");

    let tool = queries::create_plan(
        &conn,
        &CreatePlan {
            title: "College Predictor".to_string(),
            price: 99,
            plan_type: PlanType::Tool,
            expiry_date: None,
            link: Some("/tools/college-predictor".to_string()),
        },
    )
    .expect("Failed to create tool plan");

    queries::create_coupon(
        &conn,
        &CreateCoupon {
            code: "SAVE20".to_string(),
            percent_off: 20,
            applies_to: CouponScope::Any,
            expires_at: None,
            max_redemptions: Some(100),
        },
    )
    .expect("Failed to create dev coupon");

    tracing::info!("User: {} ({})", user.email, user.name);
    tracing::info!("API Token: {}", token);
    tracing::info!("Counselling plan: {} (₹{})", counselling.title, counselling.price);
    tracing::info!("Tool plan: {} (₹{})", tool.title, tool.price);
    tracing::info!("Coupon: SAVE20 (20% off)");
    tracing::info!("============================================");
    tracing::info!("SAVE THIS API TOKEN - IT WILL NOT BE SHOWN AGAIN");
    tracing::info!("============================================");
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "collegesecracy=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    if config.dev_mode {
        tracing::warn!("DEV MODE: payments settle instantly without the gateway");
    }

    let pool = create_pool(&config.database_path).expect("Failed to create database pool");
    {
        let conn = pool.get().expect("Failed to get db connection");
        init_db(&conn).expect("Failed to initialize database schema");
    }

    let gateway: Arc<dyn PaymentGateway> = if config.dev_mode {
        Arc::new(DevGateway)
    } else {
        let key_id = config
            .razorpay_key_id
            .clone()
            .expect("RAZORPAY_KEY_ID is required outside dev mode");
        let key_secret = config
            .razorpay_key_secret
            .clone()
            .expect("RAZORPAY_KEY_SECRET is required outside dev mode");
        Arc::new(RazorpayClient::new(key_id, key_secret))
    };

    let state = AppState {
        db: pool,
        base_url: config.base_url.clone(),
        dev_mode: config.dev_mode,
        key_secret: config.razorpay_key_secret.clone().unwrap_or_default(),
        webhook_secret: config.razorpay_webhook_secret.clone().unwrap_or_default(),
        gateway,
        mailer: Arc::new(EmailService::new(
            config.resend_api_key.clone(),
            config.email_from.clone(),
            config.email_enabled,
        )),
    };

    if cli.seed {
        if !config.dev_mode {
            tracing::warn!("--seed flag ignored: not in dev mode (set PAYMENT_MODE=dev)");
        } else {
            seed_dev_data(&state);
        }
    }

    let app = handlers::router()
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("CollegeSecracy payments server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Failed to start server");
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received, stopping server...");
}
