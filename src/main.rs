/// `sunrain`: sunrise/sunset scraper and rain week vs. weekend report.

use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use log::LevelFilter;

use sunrain_service::config::{Config, SourceKind, DEFAULT_CONFIG_PATH};
use sunrain_service::logging::{self, DataSource};
use sunrain_service::pipeline::{self, RainReportJob, SunScrapeJob};

#[derive(Parser)]
#[command(name = "sunrain", version, about = "Sunrise/sunset scraper and rain report")]
struct Cli {
    /// Path to the TOML config file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    /// Append log lines to this file as well
    #[arg(long)]
    log_file: Option<PathBuf>,
    /// Log debug messages
    #[arg(short, long)]
    verbose: bool,
    /// Prefix console lines with a UTC timestamp
    #[arg(long)]
    timestamps: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape the yearly sunrise/sunset tables into one CSV per year
    ScrapeSun {
        /// First year to scrape (overrides `sun.from_year`)
        #[arg(long)]
        from_year: Option<i32>,
        /// Last year to scrape, inclusive (overrides `sun.to_year`)
        #[arg(long)]
        to_year: Option<i32>,
        /// Continue with the next year after a failure
        #[arg(long)]
        keep_going: bool,
    },
    /// Write the week vs. weekend chance-of-rain report
    RainReport {
        /// Where to read rain data from (overrides `rain.source`)
        #[arg(long, value_enum)]
        source: Option<SourceKind>,
        /// Measurement CSV for `--source csv` (overrides `rain.measurements_path`)
        #[arg(long)]
        measurements: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { LevelFilter::Debug } else { LevelFilter::Info };
    if let Err(e) = logging::init_logger(level, cli.log_file.as_deref(), cli.timestamps) {
        eprintln!("cannot initialise logging: {}", e);
        return ExitCode::FAILURE;
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            logging::error(DataSource::System, None, &logging::error_chain(e.as_ref()));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let mut config = Config::load(&cli.config)?;

    match cli.command {
        Commands::ScrapeSun { from_year, to_year, keep_going } => {
            if let Some(year) = from_year {
                config.sun.from_year = year;
            }
            if let Some(year) = to_year {
                config.sun.to_year = year;
            }
            config.validate()?;
            scrape_sun(&config, keep_going)
        }
        Commands::RainReport { source, measurements } => {
            let kind = source.unwrap_or(config.rain.source);
            rain_report(&config, kind, measurements)
        }
    }
}

fn scrape_sun(config: &Config, keep_going: bool) -> Result<(), Box<dyn Error>> {
    let job = SunScrapeJob::from_config(config)?;
    let client = reqwest::blocking::Client::builder()
        .timeout(config.request_timeout())
        .build()?;

    logging::info(
        DataSource::Sun,
        None,
        &format!("Scraping {}..={}", job.years.start(), job.years.end()),
    );

    let summary = pipeline::run_sun_scrape(&client, &job, keep_going)?;
    if !summary.is_success() {
        return Err(format!("{} of {} years failed", summary.failed.len(), summary.total()).into());
    }
    Ok(())
}

fn rain_report(
    config: &Config,
    kind: SourceKind,
    measurements: Option<PathBuf>,
) -> Result<(), Box<dyn Error>> {
    let job = RainReportJob::from_config(config)?;
    let mut source = pipeline::open_rain_source(config, kind, measurements.as_deref())?;
    pipeline::run_rain_report(&job, source.as_mut())?;
    Ok(())
}
