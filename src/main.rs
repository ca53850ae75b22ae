use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use topic_loadgen::config::{ConfigError, ProducerConfig, RunConfig};
use topic_loadgen::logging;
use topic_loadgen::orchestrator::{RunSummary, run};
use topic_loadgen::output::OutputWriter;
use topic_loadgen::payload::DEFAULT_POOL_SIZE;
use topic_loadgen::sink::SinkConnector;
use topic_loadgen::sink::kcat::{self, KcatOptions};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "topic-loadgen")]
#[command(about = "Synthetic key/value load generator for a Kafka topic, driven through kcat")]
struct Cli {
    /// Topic to produce to
    #[arg(short = 't', long, default_value = "")]
    topic: String,

    /// Number of concurrent producers
    #[arg(short = 'p', long, default_value = "1")]
    producers: usize,

    /// Broker list
    #[arg(short = 'b', long, default_value = "127.0.0.1:9092")]
    brokers: String,

    /// Size of the random bytes pool
    #[arg(short = 'r', long, default_value_t = DEFAULT_POOL_SIZE)]
    random_bytes: usize,

    /// Records per producer (<= 0: unlimited)
    #[arg(short = 'n', long, default_value = "0", allow_hyphen_values = true)]
    records: i64,

    /// Key size in bytes
    #[arg(short = 'k', long, default_value = "36")]
    key_size: usize,

    /// Value size in bytes
    #[arg(short = 'v', long, default_value = "300")]
    value_size: usize,

    /// Compression codec passed to kcat
    #[arg(short = 'z', long, default_value = kcat::DEFAULT_COMPRESSION)]
    compression: String,

    /// Extra producer property as key=value; overrides the built-in batching defaults
    #[arg(short = 'X', long = "property", value_parser = kcat::parse_property)]
    properties: Vec<(String, String)>,

    /// Path to the kcat binary
    #[arg(long, default_value = kcat::DEFAULT_PROGRAM)]
    kcat: String,

    /// Rate per producer (records/s). If omitted or <= 0, runs at max speed
    #[arg(long, allow_hyphen_values = true)]
    rate: Option<f64>,

    /// Seconds between rate reports
    #[arg(long, default_value = "2", value_parser = clap::value_parser!(u64).range(1..))]
    interval: u64,

    /// Smooth reported rates with this time constant in seconds
    #[arg(long)]
    smoothing: Option<f64>,

    /// Seed for the random pool (random if omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// Write rate samples to this CSV file instead of stdout
    #[arg(long, conflicts_with = "json")]
    csv: Option<String>,

    /// Print rate samples as JSON lines
    #[arg(long)]
    json: bool,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Cli {
    fn run_config(&self) -> RunConfig {
        RunConfig {
            producer: ProducerConfig {
                topic: self.topic.clone(),
                brokers: self.brokers.clone(),
                records: self.records,
                key_size: self.key_size,
                value_size: self.value_size,
                rate: self.rate.filter(|r| *r > 0.0),
            },
            producers: self.producers,
            pool_size: self.random_bytes,
            seed: self.seed,
            report_interval: Duration::from_secs(self.interval),
            smoothing: self
                .smoothing
                .filter(|s| *s > 0.0 && s.is_finite())
                .map(Duration::from_secs_f64),
        }
    }

    fn kcat_options(&self) -> KcatOptions {
        KcatOptions {
            program: self.kcat.clone(),
            brokers: self.brokers.clone(),
            topic: self.topic.clone(),
            compression: self.compression.clone(),
            properties: self.properties.clone(),
        }
    }
}

fn print_summary(summary: &RunSummary) {
    println!("\nFinal statistics:");
    println!("  Producers: {}", summary.producers);
    println!("  Records: {}", summary.records);
    println!("  Bytes: {}", summary.bytes);
    println!("  Duration: {:.2}s", summary.elapsed.as_secs_f64());
    println!("  Average rate: {:.2} MiB/s", summary.mib_per_sec());
    if summary.report.ticks > 0 {
        println!(
            "  Records/s per tick: p50 {} p95 {} max {}",
            summary.report.records_per_sec_p50,
            summary.report.records_per_sec_p95,
            summary.report.records_per_sec_max
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init(&cli.log_level)?;

    let config = cli.run_config();
    if let Err(ConfigError::MissingTopic) = config.validate() {
        println!("topic not specified");
        return Ok(());
    }

    let connector: Arc<dyn SinkConnector> = Arc::new(cli.kcat_options().connector());
    let output = if let Some(ref path) = cli.csv {
        OutputWriter::new_csv(path.clone()).await?
    } else if cli.json {
        OutputWriter::Json
    } else {
        OutputWriter::Text
    };

    tokio::select! {
        res = run(config, connector, output) => match res {
            Ok(summary) => {
                info!(records = summary.records, bytes = summary.bytes, "load run complete");
                print_summary(&summary);
            }
            Err(e) => {
                error!(error = %format!("{:#}", e), "load run failed");
                return Err(e);
            }
        },
        _ = signal::ctrl_c() => {
            println!("Ctrl+C received, stopping producers");
        }
    }
    Ok(())
}
