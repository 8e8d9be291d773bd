//! Fake collaborators
//!
//! `FakeSource` stands in for the database, `GatedVerifier` holds every
//! verification until the test releases it. Both come from the crate's
//! `test-util` feature so unit and integration tests share one copy.

pub use shopdesk::backend::realtime::testing::{
    sample_figures, FakeSource, GatedVerifier, StaticVerifier,
};
