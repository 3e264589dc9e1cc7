use adeypay::application::coordinator::PaymentCoordinator;
use adeypay::application::surface::SurfaceManager;
use adeypay::config::ClientConfig;
use adeypay::domain::payment::{CreatePaymentOptions, PaymentStatus};
use adeypay::domain::ports::PaymentGatewayRef;
use adeypay::error::PaymentError;
use adeypay::infrastructure::http::HttpPaymentGateway;
use adeypay::infrastructure::in_memory::InMemoryPaymentGateway;
use adeypay::interfaces::terminal::{TerminalCallbacks, TerminalNavigator};
use clap::Parser;
use miette::{IntoDiagnostic, Result};
use rust_decimal::Decimal;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use url::Url;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Amount to charge
    #[arg(long, allow_hyphen_values = true)]
    amount: Decimal,

    /// Free-text note attached to the payment
    #[arg(long)]
    note: Option<String>,

    /// Merchant API key (overrides the config file)
    #[arg(long)]
    api_key: Option<String>,

    /// URL the service notifies when the payment settles (overrides the config file)
    #[arg(long)]
    callback_url: Option<String>,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Base URL of the payment service API
    #[arg(long)]
    service_base: Option<Url>,

    /// Base URL of the hosted payment page
    #[arg(long)]
    surface_base: Option<Url>,

    /// Delay between status requests, in milliseconds
    #[arg(long)]
    poll_interval_ms: Option<u64>,

    /// Give up after this many consecutive failed status requests
    #[arg(long)]
    max_poll_failures: Option<u32>,

    /// Use an in-memory service that approves every payment on its second poll
    #[arg(long)]
    simulate: bool,
}

impl Cli {
    fn client_config(&self) -> Result<ClientConfig> {
        let mut config = match &self.config {
            Some(path) => ClientConfig::from_file(path).into_diagnostic()?,
            None => ClientConfig::default(),
        };
        if let Some(url) = &self.service_base {
            config.service_base_url = url.clone();
        }
        if let Some(url) = &self.surface_base {
            config.surface.base_url = url.clone();
        }
        if let Some(key) = &self.api_key {
            config.defaults.api_key = Some(key.clone());
        }
        if let Some(url) = &self.callback_url {
            config.defaults.callback_url = Some(url.clone());
        }
        if let Some(ms) = self.poll_interval_ms {
            config.poll.interval_ms = ms;
        }
        if self.max_poll_failures.is_some() {
            config.poll.max_consecutive_failures = self.max_poll_failures;
        }
        Ok(config)
    }

    fn payment_options(&self) -> CreatePaymentOptions {
        let options = CreatePaymentOptions::new(self.amount);
        match &self.note {
            Some(note) => options.with_note(note.clone()),
            None => options,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.client_config()?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let gateway: PaymentGatewayRef = if cli.simulate {
        let gateway = InMemoryPaymentGateway::new();
        gateway.script_all(["waiting_user_input", "approved"]).await;
        Arc::new(gateway)
    } else {
        Arc::new(HttpPaymentGateway::new(&config).into_diagnostic()?)
    };

    let coordinator = Arc::new(PaymentCoordinator::new(gateway, &config));
    let mut manager = SurfaceManager::redirect(
        Arc::clone(&coordinator),
        config.surface.base_url.clone(),
        Box::new(TerminalNavigator::new(io::stdout())),
        Arc::new(TerminalCallbacks::new(io::stdout())),
    );

    let Some(id) = manager.pay(cli.payment_options()).await.into_diagnostic()? else {
        return Err(PaymentError::SessionInProgress).into_diagnostic();
    };

    let session = tokio::select! {
        session = manager.settle() => session,
        _ = tokio::signal::ctrl_c() => {
            coordinator.teardown();
            tracing::info!(payment_id = %id, "interrupted, stopped polling");
            return Err(miette::miette!("interrupted before payment {id} settled"));
        }
    };

    match (session.status(), session.abandoned_after()) {
        (PaymentStatus::Approved, _) => Ok(()),
        (_, Some(attempts)) => Err(PaymentError::PollingAbandoned {
            payment_id: id.to_string(),
            attempts,
        })
        .into_diagnostic(),
        _ => Err(PaymentError::PaymentFailed {
            payment_id: id.to_string(),
        })
        .into_diagnostic(),
    }
}
