use mimalloc::MiMalloc;
use roach_bank::db::models::DEMO_ACCOUNTS;
use roach_bank::service::{TransferRequest, report_balances, transfer_until};
use roach_bank::{AccountsStorage, Config};
use std::io;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let cfg = Config::from_env();
    let loglevel = cfg
        .as_ref()
        .map(|c| c.loglevel.clone())
        .unwrap_or_else(|_| "info".to_string());

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(loglevel));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false),
        )
        .init();

    let cfg = match cfg {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(error = %e, "error parsing configuration");
            return ExitCode::FAILURE;
        }
    };
    let req = match cfg.transfer.request() {
        Ok(req) => req,
        Err(e) => {
            error!(error = %e, "error parsing transfer settings");
            return ExitCode::FAILURE;
        }
    };

    info!(
        user = %cfg.database.user,
        host = %cfg.database.host,
        port = cfg.database.port,
        database = %cfg.database.name,
        loglevel = %cfg.loglevel,
        max_retries = cfg.retry.max_retries
    );

    let storage = match AccountsStorage::connect(&cfg.database).await {
        Ok(storage) => storage,
        Err(e) => {
            error!(error = %e, "error connecting to db");
            return ExitCode::FAILURE;
        }
    };

    let code = run(&storage, &cfg, req).await;
    storage.close().await;
    code
}

async fn run(storage: &AccountsStorage, cfg: &Config, req: TransferRequest) -> ExitCode {
    if let Err(e) = storage.init_schema().await {
        error!(error = %e, "error creating table accounts");
        return ExitCode::FAILURE;
    }

    if cfg.seed {
        match storage.seed_accounts(&DEMO_ACCOUNTS).await {
            Ok(inserted) => info!(inserted, "demo accounts seeded"),
            Err(e) => warn!(error = %e, "error inserting accounts"),
        }
    }

    println!("Initial balance");
    report_balances(storage, &mut io::stdout()).await;

    let policy = cfg.retry.policy();
    let interrupted = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "cannot listen for Ctrl-C; transfer is not cancellable");
            futures::future::pending::<()>().await;
        }
    };
    let outcome = transfer_until(storage, &policy, req, interrupted).await;

    match outcome {
        Ok(()) => {
            println!("Transfer Successful");
            println!("Final balance");
            report_balances(storage, &mut io::stdout()).await;
        }
        Err(e) => println!("Transfer Failed: {e}"),
    }
    ExitCode::SUCCESS
}
