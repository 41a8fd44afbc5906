//! Mentorship ledger HTTP service.

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use mentorship_ledger::adapters::http::{api_router, AppState, ServiceSettings};
use mentorship_ledger::adapters::postgres::{
    PostgresBalanceRepository, PostgresDisputeRepository, PostgresPaymentRepository,
    PostgresPayoutRepository, PostgresSessionDirectory, PostgresWebhookEventRepository,
};
use mentorship_ledger::adapters::{
    FixedRateConverter, InMemoryEventBus, LoggingNotificationHandler, PaymobGateway,
    StripeGateway, NOTIFICATION_EVENTS,
};
use mentorship_ledger::application::payments::PaymentGateways;
use mentorship_ledger::config::AppConfig;
use mentorship_ledger::ports::EventSubscriber;

type BoxError = Box<dyn Error + Send + Sync>;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        tracing::error!(error = %e, "Service exited with error");
        eprintln!("mentorship-ledger: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), BoxError> {
    let config = AppConfig::load()?;
    init_tracing(&config);
    config.validate()?;

    tracing::info!(
        environment = ?config.server.environment,
        stripe_test_mode = config.payment.is_test_mode(),
        "Starting mentorship ledger"
    );

    let pool = config.database.connect().await?;

    if config.database.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");
    }

    let gateways = PaymentGateways::new(
        Arc::new(StripeGateway::new(config.payment.stripe_config())),
        Arc::new(PaymobGateway::new(config.payment.paymob_config())),
    );

    let bus = Arc::new(InMemoryEventBus::new());
    bus.subscribe_all(
        &NOTIFICATION_EVENTS,
        Arc::new(LoggingNotificationHandler::new()),
    );

    let state = AppState {
        payments: Arc::new(PostgresPaymentRepository::new(pool.clone())),
        balances: Arc::new(PostgresBalanceRepository::new(pool.clone())),
        payouts: Arc::new(PostgresPayoutRepository::new(pool.clone())),
        disputes: Arc::new(PostgresDisputeRepository::new(pool.clone())),
        webhook_events: Arc::new(PostgresWebhookEventRepository::new(pool.clone())),
        sessions: Arc::new(PostgresSessionDirectory::new(pool.clone())),
        gateways,
        converter: Arc::new(FixedRateConverter::new(config.payment.egp_per_usd)?),
        event_publisher: bus,
        settings: ServiceSettings {
            payment: config.ledger.payment_settings()?,
            ledger: config.ledger.ledger_settings()?,
            payout_policy: config.ledger.payout_policy(),
        },
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweep = state.reconciliation_sweep(config.ledger.sweep_config());
    let sweep_handle = tokio::spawn(async move { sweep.run(shutdown_rx).await });

    let app = api_router(state, &config.server.http_options());

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    if let Err(e) = sweep_handle.await {
        tracing::warn!(error = %e, "Reconciliation sweep task ended abnormally");
    }

    pool.close().await;
    tracing::info!("Shutdown complete");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));

    if config.server.environment.json_logs() {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, starting graceful shutdown"),
        _ = terminate => tracing::info!("Received terminate signal, starting graceful shutdown"),
    }

    // Let in-flight callbacks finish writing.
    tokio::time::sleep(Duration::from_secs(1)).await;
}
