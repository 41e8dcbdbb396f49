//! Liveness and readiness probes.
//!
//! ```text
//! GET /health/ready   200 once stores and adapters are wired
//! GET /health/live    200 until shutdown begins
//! ```
//!
//! Both answer `503` otherwise, with a one-word status body and
//! `Cache-Control: no-store`.

use std::sync::atomic::{AtomicBool, Ordering};

use actix_web::{HttpResponse, get, http::header, web};
use serde_json::json;

/// Lifecycle flags flipped by the server bootstrap.
#[derive(Debug)]
pub struct HealthState {
    wired: AtomicBool,
    draining: AtomicBool,
}

impl Default for HealthState {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthState {
    /// Starting up: live, not yet ready.
    pub const fn new() -> Self {
        Self {
            wired: AtomicBool::new(false),
            draining: AtomicBool::new(false),
        }
    }

    /// Stores and adapters are wired; start taking traffic.
    pub fn mark_ready(&self) {
        self.wired.store(true, Ordering::Release);
    }

    /// Shutdown has begun; both probes fail from now on.
    pub fn mark_unhealthy(&self) {
        self.draining.store(true, Ordering::Release);
    }

    /// Whether readiness passes.
    pub fn is_ready(&self) -> bool {
        self.wired.load(Ordering::Acquire) && self.is_alive()
    }

    /// Whether liveness passes.
    pub fn is_alive(&self) -> bool {
        !self.draining.load(Ordering::Acquire)
    }

    fn status(&self) -> &'static str {
        if !self.is_alive() {
            "draining"
        } else if self.is_ready() {
            "ready"
        } else {
            "starting"
        }
    }
}

fn probe(state: &HealthState, passing: bool) -> HttpResponse {
    let mut response = if passing {
        HttpResponse::Ok()
    } else {
        HttpResponse::ServiceUnavailable()
    };
    response
        .insert_header((header::CACHE_CONTROL, "no-store"))
        .json(json!({ "status": state.status() }))
}

/// Readiness probe.
#[get("/health/ready")]
pub async fn ready(state: web::Data<HealthState>) -> HttpResponse {
    probe(&state, state.is_ready())
}

/// Liveness probe.
#[get("/health/live")]
pub async fn live(state: web::Data<HealthState>) -> HttpResponse {
    probe(&state, state.is_alive())
}
