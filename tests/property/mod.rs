//! Property-based tests

mod event_proptest;
mod projection_proptest;
