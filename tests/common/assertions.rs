//! Custom assertion macros and utilities
//!
//! Macros for readable failures, plus helpers for inspecting the frames a
//! connection's outbound queue received.

use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

/// Assert that a result is ok and return the value
#[macro_export]
macro_rules! assert_ok {
    ($result:expr) => {
        match $result {
            Ok(value) => value,
            Err(e) => panic!("Expected Ok, got Err: {:?}", e),
        }
    };
    ($result:expr, $message:expr) => {
        match $result {
            Ok(value) => value,
            Err(e) => panic!("{}: {:?}", $message, e),
        }
    };
}

/// Assert that a result is an error
#[macro_export]
macro_rules! assert_err {
    ($result:expr) => {
        assert!($result.is_err(), "Expected Err, got Ok");
    };
    ($result:expr, $pattern:pat) => {
        match $result {
            Err($pattern) => {}
            Ok(value) => panic!("Expected Err, got Ok: {:?}", value),
            Err(e) => panic!("Expected different error variant, got: {:?}", e),
        }
    };
}

/// Assert that a frame list contains no message of the given type
#[macro_export]
macro_rules! assert_no_frame {
    ($frames:expr, $kind:expr) => {
        assert!(
            $crate::common::assertions::of_type(&$frames, $kind).is_empty(),
            "Expected no '{}' frame, got {:?}",
            $kind,
            $frames
        );
    };
}

/// Every frame queued so far, parsed
pub fn drain(rx: &mut UnboundedReceiver<Arc<str>>) -> Vec<Value> {
    let mut frames = Vec::new();
    while let Ok(frame) = rx.try_recv() {
        frames.push(serde_json::from_str(&frame).expect("server frames are JSON"));
    }
    frames
}

/// The `type` tags of a frame list, in order
pub fn types(frames: &[Value]) -> Vec<String> {
    frames
        .iter()
        .map(|f| f["type"].as_str().unwrap_or_default().to_string())
        .collect()
}

/// Frames with the given `type` tag
pub fn of_type<'a>(frames: &'a [Value], kind: &str) -> Vec<&'a Value> {
    frames.iter().filter(|f| f["type"] == kind).collect()
}
