//! Realtime service integration tests

mod connection_test;
