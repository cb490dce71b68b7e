//! End-to-end and adversarial test suite for the Celery stake engine.
//!
//! Integration tests live under `tests/`; [`helpers`] holds the fixtures
//! they share.

pub mod helpers;
