// SPDX-FileCopyrightText: 2026 Hachi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Hachi companion router.
//!
//! This crate provides the error type, the request/classification/conversation
//! types, the HTTP wire types, and the trait seams that tier processors and
//! conversation stores implement.

pub mod api;
pub mod error;
pub mod traits;
pub mod types;

/// The reply sent when every tier failed or was disabled.
pub const FALLBACK_APOLOGY: &str =
    "I'm sorry, I encountered an error while processing your request. Please try again.";

pub use error::HachiError;
pub use traits::{ConversationStore, Processor};
pub use types::{
    ClassifiedRequest, CompanionRequest, ComplexityLevel, ConversationContext, GameContext,
    IntentCategory, Language, ProcessingTier, RequestType, Turn,
};
