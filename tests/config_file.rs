//! Configuration file persistence

use liveroll::{Config, LiveRollError, LiveParser, NotePairing};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_save_and_load_roundtrip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("config.ron");

    let mut config = Config::default();
    config.timing.update_bpm(96.0).unwrap();
    config.timing.update_bars(4);
    config.midi.input_port = Some("Keystation 49".to_string());
    config.capture.pairing = NotePairing::PerPitchStack;

    config.save(&path).unwrap();
    let loaded = Config::load(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_load_or_default_with_explicit_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.ron");
    fs::write(&path, "(timing: (bpm: 140.0, ppq: 96, bars: 1))").unwrap();

    let config = Config::load_or_default(Some(&path)).unwrap();
    let parser = LiveParser::new(config).unwrap();
    assert_eq!(parser.timing().sequence_length_ticks(), 384);
    assert_eq!(parser.clock().sequence_length_ticks(), 384);
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    let result = Config::load(&dir.path().join("absent.ron"));
    assert!(matches!(result, Err(LiveRollError::Io(_))));
}

#[test]
fn test_invalid_file_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.ron");
    fs::write(&path, "(timing: (bpm: -3.0))").unwrap();
    assert!(matches!(
        Config::load(&path),
        Err(LiveRollError::InvalidBpm(_))
    ));
}
