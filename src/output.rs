use crate::reporter::RateSample;
use anyhow::Result;
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::mpsc::UnboundedSender;

/// Destination for periodic rate samples.
pub enum OutputWriter {
    /// Human readable line on stdout.
    Text,
    Csv(BufWriter<File>),
    /// One JSON object per line on stdout.
    Json,
    /// Hand samples to another task (used by embedders and tests).
    Channel(UnboundedSender<RateSample>),
}

impl OutputWriter {
    pub async fn new_csv(path: String) -> Result<Self> {
        if let Some(parent) = std::path::Path::new(&path).parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await.ok();
            }
        }
        let file = File::create(&path).await?;
        let mut writer = BufWriter::new(file);
        writer.write_all(RateSample::csv_header().as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;

        tracing::info!(path = %path, "writing rate samples as CSV");
        Ok(Self::Csv(writer))
    }

    pub async fn write_sample(&mut self, sample: &RateSample) -> Result<()> {
        match self {
            Self::Text => {
                println!("{}", sample.to_line());
            }
            Self::Csv(writer) => {
                writer.write_all(sample.to_csv_row().as_bytes()).await?;
                writer.write_all(b"\n").await?;
                // Flush so a tail -f sees every tick.
                writer.flush().await?;
            }
            Self::Json => {
                println!("{}", serde_json::to_string(sample)?);
            }
            Self::Channel(tx) => {
                // Receiver gone just means nobody is listening any more.
                let _ = tx.send(sample.clone());
            }
        }
        Ok(())
    }
}
