use clap::Parser;
use log::info;
use overhead_flights::cli::Cli;
use overhead_flights::config::{ApplicationConfig, NotificationConfig, ReceiverConfig};
use overhead_flights::enrichment::airports::{AirportDirectory, AirportDirectoryError};
use overhead_flights::enrichment::{build_services, ServiceContext};
use overhead_flights::http::{HttpClient, HttpError, ReqwestClient};
use overhead_flights::ingestor::error::IngestError;
use overhead_flights::ingestor::FeedIngestor;
use overhead_flights::logging::setup_logging;
use overhead_flights::notification::template::{
    NotificationTemplate, TemplateError, DEFAULT_TEMPLATE,
};
use overhead_flights::notification::{NotificationDispatcher, SinkSettings};
use overhead_flights::pipeline::{queue, EventLogger, FlightProcessor, ProcessorSettings};
use overhead_flights::receiver::{ReceiverError, ReceiverLocation};
use overhead_flights::thread_manager::ThreadManager;

use thiserror::Error;

#[derive(Debug, Error)]
enum RunError {
    #[error("Failed to build HTTP client: {0}")]
    Http(#[from] HttpError),

    #[error("Could not determine receiver location: {0}")]
    Receiver(#[from] ReceiverError),

    #[error(transparent)]
    Airports(#[from] AirportDirectoryError),

    #[error("Failed to read notification template '{}': {source}", path.display())]
    TemplateIo {
        source: std::io::Error,
        path: std::path::PathBuf,
    },

    #[error("Invalid notification template: {0}")]
    Template(#[from] TemplateError),

    #[error("Failed to start task: {0}")]
    Spawn(#[from] std::io::Error),

    #[error(transparent)]
    Feed(#[from] IngestError),

    #[error("Feed ingestor exited without reporting an error")]
    IngestorStopped,
}

fn locate_receiver(
    config: &ReceiverConfig,
    http: &dyn HttpClient,
) -> Result<ReceiverLocation, ReceiverError> {
    match (config.latitude, config.longitude) {
        (Some(lat), Some(lon)) => {
            info!("Main: using configured receiver location");
            ReceiverLocation::new(lat, lon)
        }
        _ => ReceiverLocation::fetch(http, &config.url),
    }
}

fn load_template(config: &NotificationConfig) -> Result<NotificationTemplate, RunError> {
    let Some(path) = &config.template_file else {
        return Ok(NotificationTemplate::compile(DEFAULT_TEMPLATE)?);
    };
    let source = std::fs::read_to_string(path).map_err(|source| RunError::TemplateIo {
        source,
        path: path.clone(),
    })?;
    Ok(NotificationTemplate::compile(&source)?)
}

fn run(cli: &Cli, config: &ApplicationConfig) -> Result<(), RunError> {
    let http: std::sync::Arc<dyn HttpClient> = std::sync::Arc::new(ReqwestClient::with_timeout(
        config.services.http_timeout(),
    )?);

    let receiver_location = locate_receiver(&config.receiver, http.as_ref())?;
    info!(
        "Main: receiver at {}, {}",
        receiver_location.lat(),
        receiver_location.lon()
    );

    let airports = AirportDirectory::load(
        config.services.airports_file.as_deref(),
        config.services.states_file.as_deref(),
    )?;
    let template = load_template(&config.notification)?;

    let services = build_services(
        &config.services.enabled,
        &ServiceContext {
            http: http.clone(),
            airports: std::sync::Arc::new(airports),
            route_lookup_url: config.services.route_lookup_url.clone(),
            tracking_site_url: config.services.tracking_site_url.clone(),
            cache_dir: Some(config.services.cache_dir.clone()),
        },
    );

    let notifier = NotificationDispatcher::new(
        http,
        template,
        SinkSettings {
            api_url: config.notification.api_url.clone(),
            urls: config.notification.urls.clone(),
            title: config.notification.title.clone(),
        },
    );

    let (event_sender, event_receiver) = crossbeam_channel::unbounded();
    let (fatal_sender, fatal_receiver): (
        crossbeam_channel::Sender<IngestError>,
        crossbeam_channel::Receiver<IngestError>,
    ) = crossbeam_channel::unbounded();
    let (report_queue, report_receiver) = queue(event_sender.clone());

    let processor = FlightProcessor::new(
        report_receiver,
        event_sender,
        receiver_location,
        ProcessorSettings {
            policy: config.notify.policy(),
            always_check_services: config.services.always_check,
        },
        services,
        Box::new(notifier),
    );
    let ingestor = FeedIngestor::new(&config.feed, report_queue, fatal_sender);

    let mut thread_manager = ThreadManager::new();
    thread_manager.add_task("event-logger", EventLogger::new(event_receiver))?;
    thread_manager.add_task("flight-processor", processor)?;
    thread_manager.add_task("feed-ingestor", ingestor)?;

    let outcome = match cli.duration {
        Some(duration) => {
            match fatal_receiver.recv_timeout(std::time::Duration::from_secs(duration)) {
                Ok(error) => Err(RunError::Feed(error)),
                Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                    info!("Main: ran for {duration}s, stopping.");
                    Ok(())
                }
                Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                    Err(RunError::IngestorStopped)
                }
            }
        }
        None => match fatal_receiver.recv() {
            Ok(error) => Err(RunError::Feed(error)),
            Err(_) => Err(RunError::IngestorStopped),
        },
    };

    thread_manager.shutdown();
    outcome
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let application_config = match ApplicationConfig::construct_from_path(&cli.config_file) {
        Ok(config) => config,
        Err(e) => {
            setup_logging(cli.resolve_logging_level(None));
            log::error!("{e}");
            return std::process::ExitCode::FAILURE;
        }
    };

    setup_logging(cli.resolve_logging_level(application_config.logging.level));
    info!("Main: Application started.");

    if let Err(e) = run(&cli, &application_config) {
        log::error!("Main: {e}");
        return std::process::ExitCode::FAILURE;
    }

    info!("Main: Program finished.");
    std::process::ExitCode::SUCCESS
}
