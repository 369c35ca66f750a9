// SPDX-FileCopyrightText: 2026 Hachi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request routing for the Hachi companion.
//!
//! This crate provides:
//! - [`IntentClassifier`]: pattern-table intent, complexity, and tier selection
//! - [`ProcessorRegistry`]: lazily built, cached processor per tier
//! - [`CascadeController`]: preferred tier first, then each cheaper tier
//! - [`ResponseFormatter`]: raw text to the client response shape
//! - [`RequestHandler`]: the whole pipeline for one request
//! - [`recording`]: cascade counters and latency histograms

pub mod cascade;
pub mod classifier;
pub mod formatter;
pub mod handler;
pub mod recording;
pub mod registry;

pub use cascade::{Attempt, AttemptOutcome, CascadeController, CascadeOutcome};
pub use classifier::{Classification, IntentClassifier};
pub use formatter::{extract_japanese, ResponseFormatter};
pub use handler::{HandledRequest, RequestHandler};
pub use recording::register_metrics;
pub use registry::{ProcessorBuilder, ProcessorRegistry};
