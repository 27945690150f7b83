// ── Shared telemetry store ──
//
// One immutable snapshot behind a `watch` channel. Writers swap in a new
// snapshot with exactly one slice replaced; readers clone an `Arc`.

mod telemetry;

pub use telemetry::{TelemetrySnapshot, TelemetryStore};
