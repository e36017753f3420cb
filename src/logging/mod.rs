pub mod memory;
pub mod sink;
pub mod tracing_sink;

pub use memory::{FanoutSink, MemorySink};
pub use sink::{LogRecord, LogSink, Severity};
pub use tracing_sink::{TracingSink, init_tracing};
