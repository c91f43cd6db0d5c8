//! JSONL log output of a corpus recompute.

mod support;

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use mr_core::logging::{event_names, JsonlLayer};
use mr_core::{BatchOptions, NoopSink};
use serde_json::Value;
use support::corpus::{corpus, memory_engine, monster};
use tracing_subscriber::layer::SubscriberExt;

#[derive(Clone)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn capture(f: impl FnOnce()) -> Vec<Value> {
    let buffer = Arc::new(Mutex::new(Vec::new()));
    let subscriber =
        tracing_subscriber::registry().with(JsonlLayer::new(SharedBuf(buffer.clone())));
    tracing::subscriber::with_default(subscriber, f);

    let output = buffer.lock().unwrap();
    String::from_utf8_lossy(&output)
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

fn named<'a>(lines: &'a [Value], event: &str) -> Vec<&'a Value> {
    lines.iter().filter(|l| l["event"] == event).collect()
}

#[test]
fn test_batch_lines_carry_correlation_fields() {
    let mut entities = corpus(4);
    entities[1] = monster(2, "", &[]);
    let (_, engine) = memory_engine(entities);

    let lines = capture(|| {
        let report = engine
            .recompute_all(&BatchOptions::default(), &NoopSink)
            .unwrap();
        assert_eq!(report.processed, 3);
    });

    let started = named(&lines, event_names::BATCH_STARTED);
    assert_eq!(started.len(), 1);
    let run_id = started[0]["run_id"].as_str().unwrap().to_string();
    assert!(run_id.starts_with("run-"));
    assert_eq!(started[0]["stage"], "batch");
    assert_eq!(started[0]["fields"]["total"], 4);

    let done = named(&lines, event_names::RECOMPUTE_DONE);
    assert_eq!(done.len(), 3);
    for line in &done {
        assert_eq!(line["run_id"], run_id.as_str());
        assert_eq!(line["stage"], "recompute");
        assert!(line["entity_id"].is_u64());
    }

    let failed = named(&lines, event_names::BATCH_ENTITY_FAILED);
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0]["level"], "warn");
    assert_eq!(failed[0]["fields"]["code"], 10);

    let finished = named(&lines, event_names::BATCH_FINISHED);
    assert_eq!(finished.len(), 1);
    assert_eq!(finished[0]["fields"]["processed"], 3);
    assert_eq!(finished[0]["fields"]["failed"], 1);
}

#[test]
fn test_refused_batch_is_logged() {
    let (_, engine) = memory_engine(corpus(1));
    let _guard = engine.begin_batch().unwrap();

    let lines = capture(|| {
        assert!(engine
            .recompute_all(&BatchOptions::default(), &NoopSink)
            .is_err());
    });
    let refused = named(&lines, event_names::BATCH_REFUSED);
    assert_eq!(refused.len(), 1);
    assert_eq!(refused[0]["level"], "warn");
}
