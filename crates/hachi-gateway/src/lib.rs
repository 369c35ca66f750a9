// SPDX-FileCopyrightText: 2026 Hachi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for the Hachi companion.
//!
//! Exposes the routing pipeline as `POST /companion/assist` and reports
//! liveness plus tier switches on `GET /health`. `GET /metrics` serves
//! Prometheus text when the binary installed a recorder.

pub mod handlers;
pub mod server;

pub use handlers::{ErrorResponse, HealthResponse};
pub use server::{router, start_server, GatewayState, MetricsRender, ServerConfig};
