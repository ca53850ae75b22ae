#![cfg(feature = "sink-mock")]
use std::sync::Arc;
use std::time::Duration;
use topic_loadgen::config::{ConfigError, ProducerConfig, RunConfig};
use topic_loadgen::orchestrator::run;
use topic_loadgen::output::OutputWriter;
use topic_loadgen::payload::ALPHABET;
use topic_loadgen::sink::mock::MockConnector;
use topic_loadgen::wire;

fn config(topic: &str, producers: usize, records: i64, key: usize, value: usize) -> RunConfig {
    RunConfig {
        producer: ProducerConfig {
            topic: topic.into(),
            records,
            key_size: key,
            value_size: value,
            ..Default::default()
        },
        producers,
        pool_size: 64 * 1024,
        seed: Some(7),
        report_interval: Duration::from_millis(50),
        smoothing: None,
    }
}

fn quiet_output() -> OutputWriter {
    let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
    OutputWriter::Channel(tx)
}

#[tokio::test]
async fn two_producers_hundred_records_each() {
    let mock = MockConnector::new();
    let summary = run(config("t1", 2, 100, 4, 4), Arc::new(mock.clone()), quiet_output())
        .await
        .expect("run");

    assert_eq!(summary.producers, 2);
    assert_eq!(summary.records, 200);
    assert_eq!(summary.bytes, 200 * 8);
    assert_eq!(mock.opened(), 2);
    assert_eq!(mock.finished(), 2);

    let captured = mock.captured();
    assert_eq!(captured.len(), 2);
    for out in captured.values() {
        assert_eq!(out.len(), 100 * 10);
        assert_eq!(out.iter().filter(|b| **b == b'\n').count(), 100);
        for line in out.split(|b| *b == b'\n').filter(|l| !l.is_empty()) {
            assert_eq!(line.len(), 9);
            assert_eq!(line[4], b':');
            assert!(line[..4].iter().chain(&line[5..]).all(|b| ALPHABET.contains(b)));
        }
        assert_eq!(wire::parse_records(out).len(), 100);
    }
}

#[tokio::test]
async fn missing_topic_starts_nothing() {
    let mock = MockConnector::new();
    let err = run(config("", 3, 10, 4, 4), Arc::new(mock.clone()), quiet_output())
        .await
        .unwrap_err();
    assert_eq!(err.downcast_ref::<ConfigError>(), Some(&ConfigError::MissingTopic));
    assert_eq!(mock.opened(), 0);
}

#[tokio::test]
async fn failing_producer_fails_the_run() {
    let mock = MockConnector::failing(2);
    let err = run(config("t1", 4, 10, 4, 4), Arc::new(mock.clone()), quiet_output())
        .await
        .unwrap_err();
    assert!(format!("{:#}", err).contains("exit code 2"));
}

#[tokio::test]
async fn reporter_sees_the_run() {
    let mock = MockConnector::new();
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let mut cfg = config("t1", 1, 20, 4, 4);
    cfg.producer.rate = Some(100.0);
    let summary = run(cfg, Arc::new(mock), OutputWriter::Channel(tx))
        .await
        .expect("run");

    let mut reported = 0;
    while let Ok(sample) = rx.try_recv() {
        reported += sample.records;
    }
    assert_eq!(summary.records, 20);
    assert!(summary.report.ticks >= 1);
    assert!(reported > 0 && reported <= 20);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unbounded_run_keeps_going() {
    let mock = MockConnector::discarding();
    let fut = run(config("t1", 2, 0, 4, 4), Arc::new(mock.clone()), quiet_output());
    let res = tokio::time::timeout(Duration::from_millis(200), fut).await;
    assert!(res.is_err(), "unbounded run must not finish on its own");
    assert_eq!(mock.opened(), 2);
    assert_eq!(mock.finished(), 0);
    assert!(mock.bytes_written() > 0);
}
