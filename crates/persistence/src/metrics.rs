//! Database metrics collection.

use metrics::{gauge, histogram};
use sqlx::PgPool;
use std::time::Instant;

/// Records the duration of a named query.
pub fn record_query_duration(query_name: &'static str, duration_secs: f64) {
    histogram!("soil_db_query_duration_seconds", "query" => query_name).record(duration_secs);
}

/// Records connection pool gauges. Called from the health endpoint.
pub fn record_pool_metrics(pool: &PgPool) {
    let size = pool.size() as usize;
    let idle = pool.num_idle();

    gauge!("soil_db_connections_active").set(size.saturating_sub(idle) as f64);
    gauge!("soil_db_connections_idle").set(idle as f64);
    gauge!("soil_db_connections_total").set(size as f64);
}

/// Times a database operation.
///
/// ```ignore
/// let timer = QueryTimer::new("find_area");
/// let result = sqlx::query_as::<_, AreaEntity>(...).fetch_optional(&pool).await;
/// timer.record();
/// ```
pub struct QueryTimer {
    query_name: &'static str,
    start: Instant,
}

impl QueryTimer {
    pub fn new(query_name: &'static str) -> Self {
        Self {
            query_name,
            start: Instant::now(),
        }
    }

    /// Records the elapsed duration.
    pub fn record(self) {
        record_query_duration(self.query_name, self.start.elapsed().as_secs_f64());
    }
}
