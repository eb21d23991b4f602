//! Process counters
//!
//! Counters are plain atomics shared by the refresh pipeline and the request
//! server, rendered on demand in the Prometheus text exposition format.

use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};

/// Content type of the rendered exposition
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Outcome label for counters split by result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Ok,
    Err,
}

impl Outcome {
    fn label(self) -> &'static str {
        match self {
            Outcome::Ok => "ok",
            Outcome::Err => "err",
        }
    }
}

/// All counters exported by the process
#[derive(Debug, Default)]
pub struct Metrics {
    in_requests_ok: AtomicU64,
    in_requests_err: AtomicU64,
    outgoing_requests: AtomicU64,
    refresh_ok: AtomicU64,
    refresh_err: AtomicU64,
    source_failures: AtomicU64,
    aggregate_entries: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one served request
    pub fn record_in_request(&self, outcome: Outcome) {
        match outcome {
            Outcome::Ok => self.in_requests_ok.fetch_add(1, Ordering::Relaxed),
            Outcome::Err => self.in_requests_err.fetch_add(1, Ordering::Relaxed),
        };
    }

    /// Counts one request sent upstream
    pub fn record_outgoing_request(&self) {
        self.outgoing_requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts one finished refresh cycle
    pub fn record_refresh(&self, outcome: Outcome) {
        match outcome {
            Outcome::Ok => self.refresh_ok.fetch_add(1, Ordering::Relaxed),
            Outcome::Err => self.refresh_err.fetch_add(1, Ordering::Relaxed),
        };
    }

    pub fn record_source_failures(&self, count: u64) {
        self.source_failures.fetch_add(count, Ordering::Relaxed);
    }

    /// Sets the entry count of the currently published aggregate
    pub fn set_aggregate_entries(&self, count: u64) {
        self.aggregate_entries.store(count, Ordering::Relaxed);
    }

    pub fn in_requests(&self, outcome: Outcome) -> u64 {
        match outcome {
            Outcome::Ok => self.in_requests_ok.load(Ordering::Relaxed),
            Outcome::Err => self.in_requests_err.load(Ordering::Relaxed),
        }
    }

    pub fn outgoing_requests(&self) -> u64 {
        self.outgoing_requests.load(Ordering::Relaxed)
    }

    pub fn refreshes(&self, outcome: Outcome) -> u64 {
        match outcome {
            Outcome::Ok => self.refresh_ok.load(Ordering::Relaxed),
            Outcome::Err => self.refresh_err.load(Ordering::Relaxed),
        }
    }

    pub fn source_failures(&self) -> u64 {
        self.source_failures.load(Ordering::Relaxed)
    }

    /// Renders every counter in the Prometheus text format
    pub fn render(&self) -> String {
        let mut out = String::new();

        write_header(&mut out, "calproxy_in_requests", "incoming requests", "counter");
        for outcome in [Outcome::Ok, Outcome::Err] {
            let _ = writeln!(
                out,
                "calproxy_in_requests{{status=\"{}\"}} {}",
                outcome.label(),
                self.in_requests(outcome)
            );
        }

        write_header(&mut out, "calproxy_outgoing_reqs", "outgoing requests", "counter");
        let _ = writeln!(out, "calproxy_outgoing_reqs {}", self.outgoing_requests());

        write_header(&mut out, "calproxy_refresh_total", "refresh cycles", "counter");
        for outcome in [Outcome::Ok, Outcome::Err] {
            let _ = writeln!(
                out,
                "calproxy_refresh_total{{status=\"{}\"}} {}",
                outcome.label(),
                self.refreshes(outcome)
            );
        }

        write_header(
            &mut out,
            "calproxy_source_failures_total",
            "source feeds dropped from a refresh cycle",
            "counter",
        );
        let _ = writeln!(out, "calproxy_source_failures_total {}", self.source_failures());

        write_header(
            &mut out,
            "calproxy_aggregate_entries",
            "entries in the published aggregate",
            "gauge",
        );
        let _ = writeln!(
            out,
            "calproxy_aggregate_entries {}",
            self.aggregate_entries.load(Ordering::Relaxed)
        );

        out
    }
}

fn write_header(out: &mut String, name: &str, help: &str, kind: &str) {
    let _ = writeln!(out, "# HELP {} {}", name, help);
    let _ = writeln!(out, "# TYPE {} {}", name, kind);
}
