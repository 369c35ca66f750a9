// SPDX-FileCopyrightText: 2026 Hachi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait seams between the router and its tiers and stores.

pub mod processor;
pub mod store;

pub use processor::Processor;
pub use store::ConversationStore;
