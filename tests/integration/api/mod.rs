//! HTTP API integration tests

mod polling_test;
