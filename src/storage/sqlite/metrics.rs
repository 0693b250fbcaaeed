//! Storage operation metrics for `SQLite` stores.

use std::time::Instant;

/// Records the outcome and latency of a store operation.
///
/// Emits `dupcheck_storage_operations_total` and
/// `dupcheck_storage_operation_duration_ms`, labelled by operation and
/// status.
///
/// # Examples
///
/// ```ignore
/// let start = Instant::now();
/// let result = store.count();
/// record_operation_metrics("count", start, &result);
/// ```
pub fn record_operation_metrics<T, E>(
    operation: &'static str,
    start: Instant,
    result: &Result<T, E>,
) {
    let status = if result.is_ok() { "success" } else { "error" };
    metrics::counter!(
        "dupcheck_storage_operations_total",
        "backend" => "sqlite",
        "operation" => operation,
        "status" => status
    )
    .increment(1);
    metrics::histogram!(
        "dupcheck_storage_operation_duration_ms",
        "backend" => "sqlite",
        "operation" => operation,
        "status" => status
    )
    .record(start.elapsed().as_secs_f64() * 1000.0);
}
