use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Clone, Debug, Default)]
pub struct Metrics {
    pub http_requests_total: Counter,
    pub http_requests_in_flight: Gauge,
}

impl Metrics {
    /// Serializes all metrics into `name value` lines.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();

        let _ = writeln!(
            buf,
            "http_requests_total {}",
            self.http_requests_total.get()
        );
        let _ = writeln!(
            buf,
            "http_requests_in_flight {}",
            self.http_requests_in_flight.get()
        );

        buf
    }
}

#[derive(Clone, Debug, Default)]
pub struct Counter(Arc<AtomicUsize>);

impl Counter {
    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Clone, Debug, Default)]
pub struct Gauge(Arc<AtomicUsize>);

impl Gauge {
    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dec(&self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::Metrics;

    #[test]
    fn test_metrics_serialize() {
        let metrics = Metrics::default();
        metrics.http_requests_total.inc();
        metrics.http_requests_total.inc();
        metrics.http_requests_in_flight.inc();

        let buf = metrics.serialize();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "http_requests_total 2\nhttp_requests_in_flight 1\n");
    }
}
