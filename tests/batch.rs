use std::fs;
use std::sync::Arc;
use std::sync::Mutex;

use metrika_ingest::container::Container;
use metrika_ingest::execution::{BatchConverter, BatchEvent, BatchJob, BatchObserver, BatchOptions};
use metrika_ingest::ingestion::ConvertOptions;

#[derive(Default)]
struct EventLog {
    events: Mutex<Vec<String>>,
}

impl BatchObserver for EventLog {
    fn on_event(&self, event: &BatchEvent) {
        let tag = match event {
            BatchEvent::RunStarted { files } => format!("start:{files}"),
            BatchEvent::FileStarted { .. } => "file".to_string(),
            BatchEvent::FileFinished { success, .. } => format!("done:{success}"),
            BatchEvent::RunFinished { .. } => "finish".to_string(),
        };
        self.events.lock().unwrap().push(tag);
    }
}

fn seed_exports(dir: &std::path::Path) {
    fs::copy("tests/fixtures/sample_t1.csv", dir.join("T1.csv")).unwrap();
    fs::copy("tests/fixtures/semicolon_t2.csv", dir.join("T2.csv")).unwrap();
    fs::write(dir.join("T3.csv"), "").unwrap();
    fs::write(dir.join("README.txt"), "not an export").unwrap();
}

#[test]
fn directory_batch_converts_each_export_and_keeps_going_on_failure() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("exports");
    let output = dir.path().join("json");
    fs::create_dir(&input).unwrap();
    seed_exports(&input);

    let log = Arc::new(EventLog::default());
    let converter = BatchConverter::new(BatchOptions::default())
        .unwrap()
        .with_observer(log.clone());
    let metrics = converter.metrics();

    let items = converter
        .convert_directory(&input, &output, false, &ConvertOptions::default())
        .unwrap();

    let terms: Vec<_> = items.iter().map(|i| i.job.term.as_str()).collect();
    assert_eq!(terms, vec!["T1", "T2", "T3"]);
    assert!(items[0].is_success());
    assert!(items[1].is_success());
    assert!(!items[2].is_success());

    let t1 = Container::read_from_path(output.join("T1.json")).unwrap();
    assert_eq!(t1.students().len(), 2);
    assert!(output.join("T2.json").is_file());
    assert!(!output.join("T3.json").exists());

    let snap = metrics.snapshot();
    assert_eq!(snap.files_started, 3);
    assert_eq!(snap.files_succeeded, 2);
    assert_eq!(snap.files_failed, 1);
    assert_eq!(snap.students_written, 4);
    assert_eq!(snap.max_active_files, 1);
    assert!(snap.elapsed.is_some());

    let events = log.events.lock().unwrap().clone();
    assert_eq!(events.first().map(String::as_str), Some("start:3"));
    assert_eq!(events.last().map(String::as_str), Some("finish"));
    assert_eq!(events.iter().filter(|e| *e == "file").count(), 3);
    assert_eq!(events.iter().filter(|e| *e == "done:false").count(), 1);
}

#[test]
fn parallel_pool_returns_items_in_job_order() {
    let dir = tempfile::tempdir().unwrap();
    let mut jobs = Vec::new();
    for i in 0..16 {
        let input = dir.path().join(format!("T{i}.csv"));
        fs::write(&input, format!("id|nom_cognoms\n{i}|Student {i}\n")).unwrap();
        jobs.push(BatchJob::new(&input, dir.path().join(format!("T{i}.json")), format!("T{i}")));
    }

    let converter = BatchConverter::new(BatchOptions { num_threads: Some(4) }).unwrap();
    let items = converter.convert_files(&jobs, &ConvertOptions::default());

    assert_eq!(items.len(), 16);
    for (i, item) in items.iter().enumerate() {
        assert_eq!(item.job.term, format!("T{i}"));
        assert_eq!(item.result.as_ref().unwrap().students, 1);
    }
    assert_eq!(converter.metrics().snapshot().files_succeeded, 16);
}
