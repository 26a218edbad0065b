pub mod telemetry;

pub use telemetry::ExecutionStatistics;
