// SPDX-FileCopyrightText: 2026 Hachi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Hachi integration tests.
//!
//! Provides scripted tier processors and a harness wiring the full request
//! pipeline, for fast, deterministic tests without Ollama or Anthropic.
//!
//! # Components
//!
//! - [`MockProcessor`] - Tier processor with scripted replies, failures, and delays
//! - [`TestHarness`] - Real rule and decision-tree tiers plus mocked LLM tiers

pub mod harness;
pub mod mock_processor;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_processor::{MockBehavior, MockProcessor};
