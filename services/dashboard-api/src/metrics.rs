use prometheus::{IntCounter, Opts, Registry, TextEncoder};

/// Service counters, registered under the configured namespace.
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub sign_ins: IntCounter,
    pub records_fetched: IntCounter,
    pub views_mounted: IntCounter,
    pub uploads: IntCounter,
    pub deletes: IntCounter,
    pub exports: IntCounter,
}

impl Metrics {
    pub fn new(namespace: &str) -> prometheus::Result<Self> {
        let registry = Registry::new();
        let counter = |name: &str, help: &str| -> prometheus::Result<IntCounter> {
            let counter = IntCounter::with_opts(Opts::new(name, help).namespace(namespace))?;
            registry.register(Box::new(counter.clone()))?;
            Ok(counter)
        };

        Ok(Self {
            sign_ins: counter("sign_ins_total", "Successful sign-ins")?,
            records_fetched: counter("records_fetched_total", "COA records loaded for insights")?,
            views_mounted: counter("insights_views_mounted_total", "Insights views mounted")?,
            uploads: counter("attachments_uploaded_total", "Attachments uploaded")?,
            deletes: counter("attachments_deleted_total", "Attachments deleted")?,
            exports: counter("records_exported_total", "Spreadsheet exports served")?,
            registry,
        })
    }

    pub fn render(&self) -> String {
        TextEncoder::new()
            .encode_to_string(&self.registry.gather())
            .unwrap_or_else(|_| "Error encoding metrics".to_string())
    }
}
