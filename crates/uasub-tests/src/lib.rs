// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # uasub Integration Tests
//!
//! Integration tests for the `uasub-client` session and subscription
//! runtime, run against a scriptable in-memory transport.
//!
//! ## Module Structure
//!
//! - [`common`]: Shared test utilities
//!   - `fixtures`: Configurations, endpoints and notification builders
//!   - `mocks`: `MockTransport` and recording listeners
//!   - `harness`: Connected client setup and polling helpers
//!
//! ## Running Tests
//!
//! ```bash
//! # Run all integration tests
//! cargo test -p uasub-tests
//!
//! # Run specific test suite
//! cargo test -p uasub-tests --test integration_session
//! cargo test -p uasub-tests --test integration_subscription
//! cargo test -p uasub-tests --test integration_publish
//! cargo test -p uasub-tests --test integration_sequencing
//! cargo test -p uasub-tests --test integration_config
//! ```
//!
//! ## Test Categories
//!
//! ### Session Tests (`integration_session.rs`)
//! - Create, activate, close and invalidate
//! - Shared establishment attempts and single completion
//!
//! ### Subscription Tests (`integration_subscription.rs`)
//! - Derived keep-alive and lifetime counts
//! - Revised values, modify in place, delete
//! - Monitored item lifecycle
//!
//! ### Publish Tests (`integration_publish.rs`)
//! - Pipeline depth bounds
//! - Acknowledgement piggy-backing and loss on failure
//!
//! ### Sequencing Tests (`integration_sequencing.rs`)
//! - In-order delivery, gaps, Republish and read-back recovery
//! - Keep-alives and wraparound
//!
//! ### Configuration Tests (`integration_config.rs`)
//! - JSON configuration applied to the session
//! - Validation failures

pub mod common;
