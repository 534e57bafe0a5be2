//! # Concierge Testing
//!
//! Utilities for testing the coordination engine:
//!
//! - [`TestHarness`]: the whole engine in one process over a seeded store
//! - [`HttpStack`]: the whole engine over real HTTP on ephemeral ports
//! - [`ScriptedClassifier`]: exact-text intent scripts
//! - [`StubSpecialist`], [`FailingSpecialist`], [`SlowSpecialist`]: specialist doubles
//! - [`UnreachableGateway`], [`FlakyGateway`]: tool gateway fault injection
//!
//! ```rust,ignore
//! use concierge_testing::{FailingSpecialist, ScriptedClassifier, TestHarness};
//! use concierge_core::Intent;
//! use std::sync::Arc;
//!
//! let harness = TestHarness::builder()
//!     .with_classifier(Arc::new(
//!         ScriptedClassifier::new().with_default(vec![Intent::lookup(1), Intent::history(1)]),
//!     ))
//!     .build()
//!     .await?;
//! let response = harness.ask("anything").await?;
//! ```

pub mod classifier;
pub mod error;
pub mod harness;
pub mod http;
pub mod mock_gateway;
pub mod mock_specialists;

pub use classifier::ScriptedClassifier;
pub use error::{HarnessError, HarnessResult};
pub use harness::{
    DATA_ADDRESS, TEST_SESSION, TICKETING_ADDRESS, TestHarness, TestHarnessBuilder, fast_retry,
    test_config,
};
pub use http::HttpStack;
pub use mock_gateway::{FlakyGateway, UnreachableGateway};
pub use mock_specialists::{FailingSpecialist, SlowSpecialist, StubSpecialist};
