use std::{net::SocketAddr, process, str::FromStr, sync::Arc};

use axum::http::HeaderName;
use reorder_posts::{
    application::{
        access::AccessPolicy,
        error::AppError,
        listing::ListingService,
        nonce::NonceService,
        public_listing::PublicListingService,
        registry::{ExtensionPoints, ReorderRegistry},
        reorder::{ReorderEngine, ReorderService},
        settings::ReorderSettingsService,
    },
    config,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, AdminState, PublicState},
        telemetry,
    },
};
use tokio::{sync::watch, try_join};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    if settings.security.ephemeral_secret {
        warn!(
            target: "reorder_posts::config",
            "security.nonce_secret is not set; issued nonces will not survive a restart"
        );
    }

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let (admin_state, public_state) = build_application_context(repositories, &settings)?;
    serve_http(&settings, admin_state, public_state).await
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    let pool = PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

fn build_application_context(
    repositories: Arc<PostgresRepositories>,
    settings: &config::Settings,
) -> Result<(AdminState, PublicState), AppError> {
    let extensions = ExtensionPoints::default()
        .with_order_override_enabled(settings.reorder.order_override_enabled);
    let registry = Arc::new(ReorderRegistry::new(
        settings.reorder.types.clone(),
        extensions,
    )?);

    let reorder_settings = Arc::new(ReorderSettingsService::new(
        repositories.clone(),
        registry.clone(),
    ));
    let engine = ReorderEngine::new(repositories.clone(), repositories.clone());
    let reorder = Arc::new(ReorderService::new(
        engine,
        registry.clone(),
        reorder_settings.clone(),
    ));
    let listing = Arc::new(ListingService::new(
        repositories.clone(),
        registry.clone(),
        reorder_settings.clone(),
    ));
    let public_listing = Arc::new(PublicListingService::new(
        repositories.clone(),
        registry.clone(),
        reorder_settings.clone(),
    ));

    let access = AccessPolicy::new(
        settings.admin.editors.iter().cloned(),
        settings.admin.managers.iter().cloned(),
    );
    if access.is_open() {
        warn!(
            target: "reorder_posts::config",
            admin_addr = %settings.server.admin_addr,
            "no admin editors or managers configured; every admin caller is trusted"
        );
    }

    let identity_header = HeaderName::from_str(&settings.admin.identity_header)
        .map_err(|err| AppError::from(InfraError::configuration(err.to_string())))?;

    let admin_state = AdminState {
        health: repositories.clone(),
        registry: registry.clone(),
        reorder,
        listing,
        settings: reorder_settings,
        nonces: Arc::new(NonceService::new(
            settings.security.nonce_secret.as_bytes().to_vec(),
            settings.security.nonce_lifetime,
        )),
        access: Arc::new(access),
        identity_header,
        brand_title: settings.admin.brand_title.clone(),
    };

    let public_state = PublicState {
        listing: public_listing,
        health: repositories,
    };

    info!(
        target: "reorder_posts::startup",
        types = ?registry.allowed_types().iter().map(|ty| ty.name.as_str()).collect::<Vec<_>>(),
        "reorder registry ready"
    );

    Ok((admin_state, public_state))
}

async fn serve_http(
    settings: &config::Settings,
    admin_state: AdminState,
    public_state: PublicState,
) -> Result<(), AppError> {
    let admin_router = http::build_admin_router(admin_state);
    let public_router = http::build_public_router(public_state);

    let public_listener = bind(settings.server.public_addr).await?;
    let admin_listener = bind(settings.server.admin_addr).await?;

    info!(
        target: "reorder_posts::startup",
        public_addr = %settings.server.public_addr,
        admin_addr = %settings.server.admin_addr,
        "listeners bound"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let grace = settings.server.graceful_shutdown;
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!(
                target: "reorder_posts::shutdown",
                grace_secs = grace.as_secs(),
                "shutdown requested"
            );
            let _ = shutdown_tx.send(true);
            tokio::time::sleep(grace).await;
            warn!(
                target: "reorder_posts::shutdown",
                "graceful shutdown timed out; exiting"
            );
            process::exit(1);
        }
    });

    let public_server = axum::serve(public_listener, public_router.into_make_service())
        .with_graceful_shutdown(wait_for_shutdown(shutdown_rx.clone()));
    let admin_server = axum::serve(admin_listener, admin_router.into_make_service())
        .with_graceful_shutdown(wait_for_shutdown(shutdown_rx));

    try_join!(async { public_server.await }, async { admin_server.await })
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    Ok(())
}

async fn bind(addr: SocketAddr) -> Result<tokio::net::TcpListener, AppError> {
    tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|err| AppError::from(InfraError::bind(addr, err)))
}

async fn wait_for_shutdown(mut rx: watch::Receiver<bool>) {
    let _ = rx.wait_for(|stop| *stop).await;
}
