//! Observability for Cardroom: tracing subscriber and OpenTelemetry bridge.

pub mod tracing_setup;
