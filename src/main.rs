use std::process;
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;
use url::Url;
use transformation_service::{
    negotiation, poll_response, retrieval, Negotiation, ReportFormat, Reporter, ServiceError,
    SnapshotSource, VersionRegistry,
};

#[derive(Parser, Debug)]
#[command(name = "transformation-service")]
#[command(about = "Negotiate API versions and build transformation poll responses")]
struct Args {
    /// Output format
    #[arg(long, value_enum, default_value = "console", global = true)]
    format: ReportFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check a client version against a server version
    Check {
        /// Version implemented by the server
        #[arg(long, value_name = "VERSION")]
        server: String,

        /// Version sent by the client in Accept-Version
        #[arg(long, value_name = "VERSION")]
        client: Option<String>,
    },

    /// Negotiate a request for a registered operation
    Negotiate {
        /// Operation id (transform, poll, retrieve, delete)
        #[arg(long)]
        operation: String,

        /// Version sent by the client in Accept-Version
        #[arg(long, value_name = "VERSION")]
        client: Option<String>,

        /// YAML file mapping operations to server versions; defaults to this package's version
        #[arg(long, value_name = "FILE", env = "TRANSFORM_VERSION_REGISTRY")]
        registry: Option<String>,
    },

    /// Build the poll response for a transformation snapshot
    Poll {
        /// JSON snapshot file or http(s) URL of the transformation
        source: String,

        /// URI the transformation is polled at
        #[arg(long, value_name = "URL")]
        base_location: Url,
    },

    /// Locate the produced content of one metadata type
    Retrieve {
        /// JSON snapshot file or http(s) URL of the transformation
        source: String,

        #[arg(long, value_name = "TYPE")]
        metadata_type: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let reporter = Reporter::new().with_format(args.format);

    match run(args.command, &reporter).await {
        Ok(output) => print!("{}", output),
        Err(failure) => {
            print!("{}", failure.output);
            match reporter.format_error(&failure.error) {
                Ok(report) => eprint!("{}", report),
                Err(report_err) => eprintln!("\n❌ Error: {} ({})", failure.error, report_err),
            }
            process::exit(1);
        }
    }
}

/// `RUST_LOG` when set, warnings otherwise
fn log_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// A failed command, with whatever it rendered before failing
#[derive(Debug)]
struct CommandError {
    output: String,
    error: ServiceError,
}

impl From<ServiceError> for CommandError {
    fn from(error: ServiceError) -> Self {
        Self {
            output: String::new(),
            error,
        }
    }
}

async fn run(command: Command, reporter: &Reporter) -> Result<String, CommandError> {
    match command {
        Command::Check { server, client } => {
            let outcome = negotiation::check(&server, client.as_deref().unwrap_or_default())
                .map_err(ServiceError::from)?;
            report_negotiation(
                Negotiation {
                    operation: "check".to_string(),
                    content_version: Some(server),
                    outcome,
                },
                client.as_deref(),
                reporter,
            )
        }
        Command::Negotiate {
            operation,
            client,
            registry,
        } => {
            let registry = load_registry(registry)?;
            negotiate_and_report(&registry, &operation, client.as_deref(), reporter)
        }
        Command::Poll {
            source,
            base_location,
        } => Ok(poll(&source, &base_location, reporter).await?),
        Command::Retrieve {
            source,
            metadata_type,
        } => Ok(retrieve(&source, &metadata_type, reporter).await?),
    }
}

fn load_registry(path: Option<String>) -> Result<VersionRegistry, ServiceError> {
    let registry = match path {
        Some(path) => VersionRegistry::from_yaml_file(path)?,
        None => VersionRegistry::with_package_version()?,
    };
    Ok(registry)
}

async fn poll(
    source: &str,
    base_location: &Url,
    reporter: &Reporter,
) -> Result<String, ServiceError> {
    let transform = SnapshotSource::parse(source).load().await?;
    let response = poll_response::aggregate(&transform, base_location)?;
    Ok(reporter.format_poll_response(&response)?)
}

async fn retrieve(
    source: &str,
    metadata_type: &str,
    reporter: &Reporter,
) -> Result<String, ServiceError> {
    let transform = SnapshotSource::parse(source).load().await?;
    let content = retrieval::retrieve_content(&transform, metadata_type)?;
    Ok(reporter.format_content(&content)?)
}

fn negotiate_and_report(
    registry: &VersionRegistry,
    operation: &str,
    client: Option<&str>,
    reporter: &Reporter,
) -> Result<String, CommandError> {
    let negotiation = registry
        .negotiate(operation, client)
        .map_err(ServiceError::from)?;
    report_negotiation(negotiation, client, reporter)
}

/// Renders the negotiation, Content-Version included whatever the outcome. An
/// incompatible client still gets the rendered text alongside the error.
fn report_negotiation(
    negotiated: Negotiation,
    client: Option<&str>,
    reporter: &Reporter,
) -> Result<String, CommandError> {
    debug!(
        "{}: {:?}, {}: {:?}",
        negotiation::ACCEPT_VERSION,
        client,
        negotiation::CONTENT_VERSION,
        negotiated.content_version
    );

    let output = reporter
        .format_negotiation(&negotiated)
        .map_err(ServiceError::from)?;
    match ServiceError::from_outcome(&negotiated.outcome) {
        Some(error) => Err(CommandError { output, error }),
        None => Ok(output),
    }
}
