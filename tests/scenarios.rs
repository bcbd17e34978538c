use std::error::Error;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};

use approx::assert_relative_eq;
use vigil::catalogue::Property;
use vigil::orchestrator::FailureReason;
use vigil::store::ResultStore;
use vigil::synthesis::{Clauses, SynthesisError};
use vigil::thresholds::{ThresholdRegistry, ThresholdRule};
use vigil::{pipeline, MonitorConfig, MonitorError, RunConfig, Status, TimeSemantics};

fn config(dir: &Path, csv: &str) -> Result<RunConfig, Box<dyn Error>> {
    let input = dir.join("telemetry.csv");
    fs::write(&input, csv)?;

    let mut config = MonitorConfig::default().resolve()?;
    config.input = input;
    config.output = dir.join("stl_result").join("stl_results.json");
    config.registry = ThresholdRegistry::new(vec![ThresholdRule::max("speed", 100.0)], 5.0)?;

    Ok(config)
}

/// Log output collected in memory.
#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Captured {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

const OVERSPEED: &str = "time,speed\n0,50\n1,110\n2,110\n3,90\n";

#[test]
fn overspeed_recovers_within_window() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let mut config = config(dir.path(), OVERSPEED)?;
    config.properties = Vec::new();

    let clauses = Clauses::collect(&config.registry, ["speed"]);
    assert_eq!(clauses.violations, vec!["speed > 100"]);
    assert_eq!(clauses.recoveries, vec!["speed <= 100"]);

    let report = pipeline::run(&config);

    assert_eq!(
        report.envelope.as_deref(),
        Some("out = always((speed > 100) implies eventually[0:5](speed <= 100))")
    );
    assert!(report.failures.is_empty());
    assert_eq!(report.records.len(), 4);

    let at_one = report.records.iter().find(|r| r.timestamp == 1.0).ok_or("no record at t=1")?;
    assert_relative_eq!(at_one.robustness, 10.0);
    assert_eq!(at_one.status, Status::Success);
    assert!(report.records.iter().all(|r| r.stl_spec_id == 4));

    Ok(())
}

#[test]
fn discrete_mode_gives_same_verdicts() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let mut config = config(dir.path(), OVERSPEED)?;
    config.mode = TimeSemantics::Discrete;
    config.properties = Vec::new();

    let report = pipeline::run(&config);
    let robustness: Vec<_> = report.records.iter().map(|r| r.robustness).collect();

    assert_eq!(robustness, vec![10.0, 10.0, 10.0, 10.0]);

    Ok(())
}

#[test]
fn missing_time_column_skips_everything() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let config = config(dir.path(), "speed,x\n50,1\n110,2\n")?;

    let report = pipeline::run(&config);

    assert!(!report.has_data());
    assert!(report.records.is_empty());
    assert!(report.failures.is_empty());
    assert!(report.envelope.is_none());
    assert!(!config.output.exists());

    Ok(())
}

#[test]
fn broken_property_does_not_stop_others() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let mut config = config(dir.path(), OVERSPEED)?;
    config.properties = vec![
        Property::new("broken", 1, "out = always((speed > 100) implies"),
        Property::new("speed", 2, "out = always(speed <= 120)"),
    ];
    config.registry = ThresholdRegistry::new(vec![ThresholdRule::range("x", 0.0, 600.0)], 5.0)?;

    let report = pipeline::run(&config);

    assert!(report.records.iter().all(|r| r.stl_spec_id == 2));
    assert_eq!(report.records.len(), 4);

    let ids: Vec<_> = report.failures.iter().map(|f| f.id).collect();
    assert_eq!(ids, vec![1, 4]);
    assert!(matches!(report.failures[0].reason, FailureReason::Load(MonitorError::Parse(_))));
    assert!(matches!(
        report.failures[1].reason,
        FailureReason::Synthesis(SynthesisError::NoMonitoredSignals)
    ));

    let stored = ResultStore::new(&config.output).load()?;
    assert_eq!(stored, report.records);

    Ok(())
}

#[test]
fn each_failure_is_logged_once() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let mut config = config(dir.path(), OVERSPEED)?;
    config.properties = vec![Property::new("broken", 1, "out = always(")];

    let captured = Captured::default();
    let writer = captured.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();

    let report = tracing::subscriber::with_default(subscriber, || pipeline::run(&config));
    let logged = captured.text().lines().filter(|line| line.contains("property failed")).count();

    assert_eq!(report.failures.len(), 1);
    assert_eq!(logged, 1);

    Ok(())
}

#[test]
fn reference_catalogue_over_vehicle_log() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let csv = "time,device_id,speed,acceleration,x,y,angle\n\
               0,7,90,1,100,10,0\n\
               1,7,105,25,100,10,0\n\
               2,7,95,2,650,10,0\n\
               3,7,90,0,590,10,0\n";
    let mut config = config(dir.path(), csv)?;
    config.vehicle_id = 7;
    config.registry = ThresholdRegistry::default();

    let report = pipeline::run(&config);

    assert!(report.failures.is_empty(), "{:?}", report.failures);
    assert_eq!(report.records.len(), 5 * 4);
    assert!(report.records.iter().all(|r| r.vehicle_id == 7));
    assert_eq!(report.stored, Some(20));

    // acceleration 25 at t=1 lies inside the first window of the acc property
    let acc = report
        .records
        .iter()
        .find(|r| r.stl_spec_id == 1 && r.timestamp == 0.0)
        .ok_or("no acc record")?;
    assert_relative_eq!(acc.robustness, -5.0);
    assert_eq!(acc.status, Status::Violation);

    Ok(())
}

#[test]
fn fresh_run_replaces_previous_results() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let mut config = config(dir.path(), OVERSPEED)?;
    config.properties = Vec::new();

    pipeline::run(&config);
    pipeline::run(&config);
    assert_eq!(ResultStore::new(&config.output).load()?.len(), 8);

    config.fresh = true;
    let report = pipeline::run(&config);
    assert_eq!(report.stored, Some(4));

    Ok(())
}

#[test]
fn persist_failure_keeps_records() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let mut config = config(dir.path(), OVERSPEED)?;
    config.properties = Vec::new();
    config.output = dir.path().join("results.json");
    fs::write(&config.output, "not json")?;

    let report = pipeline::run(&config);

    assert_eq!(report.records.len(), 4);
    assert!(report.persist_error.is_some());
    assert!(report.stored.is_none());

    Ok(())
}
