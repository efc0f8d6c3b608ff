//! End-to-end pipeline tests over on-disk logs.
//!
//! These run the full worker against real files, the way the CLI does.
//! They need the mock dialect: `cargo test --features mock-codec`.
#![cfg(feature = "mock-codec")]

use logpipe_rs::codec::mock::MockCodec;
use logpipe_rs::{worker, FieldKey, OutputFormat, ProgressEvent, RunConfig, WorkerState};
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::sync::atomic::Ordering;
use tempfile::NamedTempFile;

fn write_log(records: &[Vec<u8>]) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp log");
    for record in records {
        file.write_all(record).unwrap();
    }
    file.flush().unwrap();
    file
}

fn run_to_file(config: RunConfig, log: &NamedTempFile) -> (WorkerState, Vec<u8>) {
    let output = NamedTempFile::new().expect("temp output");
    let input = File::open(log.path()).unwrap();
    let total = input.metadata().unwrap().len();
    let sink = BufWriter::new(File::create(output.path()).unwrap());

    let handle = worker::spawn(
        config,
        Box::new(MockCodec::default_dialect()),
        Box::new(input),
        Some(total),
        Box::new(sink),
    );
    let state = handle.join();

    let mut bytes = Vec::new();
    File::open(output.path())
        .unwrap()
        .read_to_end(&mut bytes)
        .unwrap();
    (state, bytes)
}

#[test]
fn csv_run_over_disk_log() {
    let codec = MockCodec::default_dialect();
    let log = write_log(&[
        codec.frame(1_000_000, "IMU", &[10, 1, 2, 3]).unwrap(),
        codec.frame(1_100_000, "BATTERY", &[11900, 2000]).unwrap(),
        codec.frame(1_200_000, "IMU", &[20, 4, 5, 6]).unwrap(),
    ]);

    let config = RunConfig {
        types: vec!["IMU".into(), "BATTERY".into()],
        format: OutputFormat::Csv,
        align: Some(FieldKey::new("IMU", "time_ms")),
        description_section: false,
        ..RunConfig::default()
    };

    let (state, bytes) = run_to_file(config, &log);
    assert_eq!(state, WorkerState::Completed);

    let out = String::from_utf8(bytes).unwrap();
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(
        lines[0],
        "TIMESTAMP,IMU_TIME_MS,IMU_AX,IMU_AY,IMU_AZ,BATTERY_VOLTAGE_MV,BATTERY_CURRENT_MA"
    );
    // Two IMU ticks, the second carrying the battery reading held between
    // them.
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[1], "1,10,1,2,3,0,0");
    assert_eq!(lines[2], "1.2,20,4,5,6,11900,2000");

    // Every data row splits into the full declared column count.
    for line in &lines[1..] {
        assert_eq!(line.split(',').count(), 7);
    }
}

#[test]
fn binary_passthrough_round_trips_through_pipeline() {
    let codec = MockCodec::default_dialect();
    let imu_1 = codec.frame(1_000_000, "IMU", &[1, 0, 0, 0]).unwrap();
    let gps = codec.frame(2_000_000, "GPS", &[2, 3, 4, 5]).unwrap();
    let imu_2 = codec.frame(3_000_000, "IMU", &[6, 0, 0, 0]).unwrap();
    let log = write_log(&[imu_1.clone(), gps, imu_2.clone()]);

    // First pass: write a filtered binary copy with only IMU frames.
    let config = RunConfig {
        types: vec!["IMU".into()],
        format: OutputFormat::Binary,
        ..RunConfig::default()
    };
    let (state, bytes) = run_to_file(config, &log);
    assert_eq!(state, WorkerState::Completed);

    let mut expected = imu_1;
    expected.extend(imu_2);
    assert_eq!(bytes, expected);

    // Second pass: the filtered copy is itself a valid input log.
    let filtered = write_log(&[bytes]);
    let config = RunConfig {
        format: OutputFormat::Standard,
        ..RunConfig::default()
    };
    let (state, bytes) = run_to_file(config, &filtered);
    assert_eq!(state, WorkerState::Completed);
    let out = String::from_utf8(bytes).unwrap();
    assert_eq!(out.lines().count(), 2);
    assert!(out.contains("IMU { time_ms : 1,"));
    assert!(out.contains("IMU { time_ms : 6,"));
}

#[test]
fn robust_run_survives_corruption_in_disk_log() {
    let codec = MockCodec::default_dialect();
    let log = write_log(&[
        codec.frame(1, "IMU", &[1, 0, 0, 0]).unwrap(),
        vec![0x00, 0x13, 0x37], // garbage between records
        codec.frame(2, "IMU", &[2, 0, 0, 0]).unwrap(),
    ]);

    let config = RunConfig {
        robust: true,
        ..RunConfig::default()
    };
    let (state, bytes) = run_to_file(config, &log);
    assert_eq!(state, WorkerState::Completed);

    let out = String::from_utf8(bytes).unwrap();
    assert_eq!(out.lines().count(), 2);
    assert!(out.contains("IMU { time_ms : 1,"));
    assert!(out.contains("IMU { time_ms : 2,"));
    assert!(!out.contains("BAD_DATA"));
}

#[test]
fn follow_mode_picks_up_appended_frames_and_cancels() {
    let codec = MockCodec::default_dialect();
    let log = write_log(&[codec.frame(1_000_000, "IMU", &[1, 0, 0, 0]).unwrap()]);

    let output = NamedTempFile::new().unwrap();
    let input = File::open(log.path()).unwrap();
    let config = RunConfig {
        follow: true,
        poll_interval_ms: 5,
        ..RunConfig::default()
    };
    let handle = worker::spawn(
        config,
        Box::new(MockCodec::default_dialect()),
        Box::new(input),
        None,
        Box::new(File::create(output.path()).unwrap()),
    );

    // Append a second frame while the worker is tailing the file.
    std::thread::sleep(std::time::Duration::from_millis(30));
    let mut appender = std::fs::OpenOptions::new()
        .append(true)
        .open(log.path())
        .unwrap();
    appender
        .write_all(&codec.frame(2_000_000, "IMU", &[2, 0, 0, 0]).unwrap())
        .unwrap();
    appender.flush().unwrap();
    std::thread::sleep(std::time::Duration::from_millis(50));

    // Cooperative shutdown must complete, not fail.
    handle.stop_flag().store(false, Ordering::SeqCst);
    let events = handle.events().clone();
    assert_eq!(handle.join(), WorkerState::Completed);
    assert!(events.try_iter().all(|e| !matches!(e, ProgressEvent::Error(_))));

    let mut out = String::new();
    File::open(output.path())
        .unwrap()
        .read_to_string(&mut out)
        .unwrap();
    assert!(out.contains("IMU { time_ms : 1,"));
    assert!(out.contains("IMU { time_ms : 2,"));
}
