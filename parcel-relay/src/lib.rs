#![forbid(unsafe_code)]

pub mod error;
pub mod limiter;
pub mod scheduler;
pub mod sender;
pub mod telemetry;
pub mod transport;

pub use error::{DeliveryError, Result, TransportError};
pub use limiter::TokenBucket;
pub use scheduler::{CycleReport, FileOutcome, Scheduler, SchedulerState, SkipReason};
pub use sender::{Delivered, RateLimitedSender};
pub use telemetry::{DeliveryEvent, EventKind, HttpTelemetry, NoTelemetry, TelemetrySink, sink_for};
pub use transport::telegram::TelegramTransport;
pub use transport::{MessageRef, TextFormat, Transport};
