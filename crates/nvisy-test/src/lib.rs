#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for the in-memory storage provider.
pub const TRACING_TARGET_MOCK: &str = "nvisy_test::mock";

/// Tracing target for conformance suite runs.
pub const TRACING_TARGET_SUITE: &str = "nvisy_test::suite";

mod mock;
mod suite;

pub use mock::{MockStorageConfig, MockStorageProvider, create_mock_registry};
pub use suite::{StorageTestSuite, SuiteError, SuiteResult};
