#![cfg(unix)]
use std::sync::Arc;
use topic_loadgen::config::{ProducerConfig, RunConfig};
use topic_loadgen::orchestrator::run;
use topic_loadgen::output::OutputWriter;
use topic_loadgen::sink::SinkConnector;
use topic_loadgen::sink::process::ProcessConnector;

fn sh(script: &str) -> ProcessConnector {
    ProcessConnector::new("sh", vec!["-c".into(), script.into()]).forward_output(false)
}

fn config(producers: usize, records: i64) -> RunConfig {
    RunConfig {
        producer: ProducerConfig {
            topic: "t1".into(),
            records,
            key_size: 4,
            value_size: 4,
            ..Default::default()
        },
        producers,
        pool_size: 4096,
        seed: Some(1),
        ..Default::default()
    }
}

#[tokio::test]
async fn child_reads_every_record() {
    let mut sink = sh("wc -l").open(0).await.expect("open");
    for _ in 0..100 {
        sink.write(b"abcd:efgh\n").await.expect("write");
    }
    let out = sink.finish().await.expect("finish");
    assert_eq!(String::from_utf8_lossy(&out.stdout).trim(), "100");
}

#[tokio::test]
async fn run_through_real_processes() {
    let summary = run(config(2, 100), Arc::new(sh("cat > /dev/null")), OutputWriter::Json)
        .await
        .expect("run");
    assert_eq!(summary.producers, 2);
    assert_eq!(summary.records, 200);
}

#[tokio::test]
async fn nonzero_exit_is_fatal() {
    let err = run(
        config(2, 100_000),
        Arc::new(sh("head -c 10 > /dev/null; echo boom >&2; exit 7")),
        OutputWriter::Json,
    )
    .await
    .unwrap_err();
    assert!(format!("{:#}", err).contains("exit code 7"), "{:#}", err);
}
