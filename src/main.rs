use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use notification_worker::api::{self, ApiState};
use notification_worker::bus;
use notification_worker::config::{self, Config};
use notification_worker::dispatch::Dispatcher;
use notification_worker::models::event::NotificationEvent;
use notification_worker::notification::fanout::{FanoutNotifier, FanoutTransport};
use notification_worker::notification::pusher::PusherClient;
use notification_worker::store::postgres::PgStore;
use notification_worker::store::NotificationStore;
use notification_worker::worker::NotificationWorker;

mod cli;

const FANOUT_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // OTLP export is opt-in: only when an endpoint is configured.
    use opentelemetry::KeyValue;

    use opentelemetry_sdk::{trace as sdktrace, Resource};

    let telemetry_layer = if std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").is_ok() {
        let tracer = opentelemetry_otlp::new_pipeline()
            .tracing()
            .with_exporter(opentelemetry_otlp::new_exporter().tonic())
            .with_trace_config(sdktrace::config().with_resource(Resource::new(vec![
                KeyValue::new("service.name", "notification-worker"),
            ])))
            .install_batch(opentelemetry_sdk::runtime::Tokio)
            .context("failed to install OpenTelemetry tracer")?;
        Some(tracing_opentelemetry::layer().with_tracer(tracer))
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "notification_worker=debug,tower_http=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .with(telemetry_layer)
        .init();

    let cfg = config::load()?;
    let args = cli::Cli::parse();

    tracing::info!(
        environment = %cfg.environment,
        pattern = %cfg.subject_pattern,
        "configuration loaded"
    );

    let result = match args.command {
        Some(cli::Commands::Serve { port }) => {
            let port = port.unwrap_or(cfg.api_port);
            run_worker(cfg, port).await
        }
        Some(cli::Commands::PublishTest {
            owner,
            trigger_user,
            username,
            action,
            resource_type,
            resource_id,
            excerpt,
            subject,
        }) => {
            let event = NotificationEvent {
                owner,
                trigger_user,
                username,
                user_picture: "https://example.com/pic.jpg".into(),
                user_bio: "Test user bio".into(),
                action,
                resource_type,
                resource_id,
                excerpt,
                created_at: chrono::Utc::now().timestamp(),
            };
            let subject = subject.unwrap_or_else(|| bus::subject_for(action));
            publish_test_event(&cfg, &subject, &event).await
        }
        Some(cli::Commands::Notifications { command }) => {
            let db = PgStore::connect(&cfg.database_url).await?;
            handle_notification_command(&db, command).await
        }
        None => {
            let port = cfg.api_port;
            run_worker(cfg, port).await
        }
    };

    if let Err(ref e) = result {
        eprintln!("Error: {:?}", e);
    }
    result
}

async fn run_worker(cfg: Config, port: u16) -> anyhow::Result<()> {
    tracing::info!("Connecting to database...");
    let db = PgStore::connect(&cfg.database_url).await?;

    tracing::info!("Running migrations...");
    db.migrate().await?;
    let store: Arc<dyn NotificationStore> = Arc::new(db);

    let fanout = match &cfg.pusher {
        Some(pusher) => {
            let transport: Arc<dyn FanoutTransport> = Arc::new(PusherClient::new(pusher.clone())?);
            tracing::info!(cluster = %pusher.cluster, "Pusher client initialized for real-time notifications");
            FanoutNotifier::new(Some(transport))
        }
        None => {
            tracing::warn!("Pusher credentials not provided - real-time notifications disabled");
            FanoutNotifier::disabled()
        }
    };

    let pushes = fanout.clone();
    let dispatcher = Arc::new(Dispatcher::new(store.clone(), fanout));

    tracing::info!("Connecting to Redis bus...");
    let messages = bus::subscribe(&cfg.redis_url, &cfg.subject_pattern).await?;

    let worker = Arc::new(NotificationWorker::new(dispatcher));
    let mut worker_task = tokio::spawn({
        let worker = worker.clone();
        async move { worker.run(messages).await }
    });

    let app = api::router(ApiState {
        store,
        admin_key: cfg.admin_key.clone(),
    });
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("read API listening on {}", addr);

    let (api_stop_tx, api_stop_rx) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                api_stop_rx.await.ok();
            })
            .await
    });

    let finished_early = tokio::select! {
        _ = shutdown_signal() => None,
        joined = &mut worker_task => Some(joined),
    };

    let result = match finished_early {
        None => {
            tracing::info!("Shutdown signal received, cleaning up...");
            worker.stop();
            worker_task.await.context("worker task failed")?;
            Ok(())
        }
        Some(joined) => {
            joined.context("worker task failed")?;
            Err(anyhow::anyhow!("bus subscription closed"))
        }
    };

    if pushes.is_enabled() {
        drain_pushes(&pushes).await;
    }

    api_stop_tx.send(()).ok();
    server.await.context("read API task failed")??;

    tracing::info!("Notification worker stopped");
    result
}

/// Give in-flight real-time pushes a bounded window to finish.
async fn drain_pushes(pushes: &FanoutNotifier) {
    let pending = pushes.pending();
    if pending > 0 {
        tracing::info!(pending, "waiting for real-time pushes");
    }
    if tokio::time::timeout(FANOUT_DRAIN_TIMEOUT, pushes.drain())
        .await
        .is_err()
    {
        tracing::warn!(
            pending = pushes.pending(),
            "real-time pushes still running at shutdown, abandoning them"
        );
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

async fn publish_test_event(
    cfg: &Config,
    subject: &str,
    event: &NotificationEvent,
) -> anyhow::Result<()> {
    let redis_client = redis::Client::open(cfg.redis_url.as_str())?;
    let mut conn = redis::aio::ConnectionManager::new(redis_client).await?;

    let receivers = bus::publish(&mut conn, subject, event).await?;
    println!("Published event to {}", subject);
    println!("  Owner:        {}", event.owner);
    println!("  Trigger user: {} ({})", event.username, event.trigger_user);
    println!("  Resource:     {} ({})", event.resource_type, event.resource_id);
    println!("  Receivers:    {}", receivers);
    if receivers == 0 {
        println!("No worker is subscribed; the event was not delivered.");
    }
    Ok(())
}

async fn handle_notification_command(
    db: &PgStore,
    cmd: cli::NotificationCommands,
) -> anyhow::Result<()> {
    match cmd {
        cli::NotificationCommands::List { recipient, limit } => {
            let notifs = db.list_by_recipient(&recipient, limit).await?;
            if notifs.is_empty() {
                println!("No notifications found.");
                return Ok(());
            }

            println!(
                "{:<38} {:<7} {:<20} {:<6} {:<20} ACTION KEY",
                "ID", "ACTION", "FROM", "READ", "CREATED"
            );
            for n in notifs {
                println!(
                    "{:<38} {:<7} {:<20} {:<6} {:<20} {}",
                    n.id,
                    n.action,
                    n.user_id,
                    n.read_status,
                    n.created_at.format("%Y-%m-%d %H:%M:%S"),
                    n.action_key
                );
            }
        }
        cli::NotificationCommands::MarkRead {
            recipient,
            action_key,
        } => {
            if db.mark_read(&recipient, &action_key).await? {
                println!("Notification marked as read.");
            } else {
                println!("Notification not found.");
            }
        }
    }
    Ok(())
}
