//! Shared test utilities and fixtures for Scopelog integration tests.

use std::sync::Arc;

use scopelog_core::{inject, trace_record, Context, MemoryLogger, Tracer};

pub use scopelog_core::AccessLogData;

trace_record! {
    /// Trace fields used by the fixtures
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct JobIds {
        #[trace(tracer = "trace_id")]
        pub job_id: String,
        pub attempt: u32,
    }
}

/// Fresh shared in-memory logger
pub fn memory_logger() -> Arc<MemoryLogger> {
    Arc::new(MemoryLogger::new())
}

/// Background context carrying `JobIds { job_id, attempt: 1 }`
pub fn job_context(job_id: &str) -> Context {
    let ids = JobIds {
        job_id: job_id.to_string(),
        attempt: 1,
    };
    let tracer = Tracer::new(&ids).expect("fixture record is traceable");
    inject(&Context::background(), tracer)
}

/// Install a test subscriber once; later calls are no-ops
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_test_writer()
        .try_init();
}

/// Running axum server bound to a random local port
pub mod server {
    use anyhow::Context as _;
    use axum::Router;
    use tokio::task::JoinHandle;

    pub struct TestServer {
        pub base_url: String,
        handle: JoinHandle<()>,
    }

    impl TestServer {
        pub fn url(&self, path: &str) -> String {
            format!("{}{}", self.base_url, path)
        }
    }

    impl Drop for TestServer {
        fn drop(&mut self) {
            self.handle.abort();
        }
    }

    /// Start serving `router`
    pub async fn start(router: Router) -> anyhow::Result<TestServer> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .context("bind to random port")?;
        let addr = listener.local_addr()?;

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                eprintln!("test server stopped: {e}");
            }
        });

        Ok(TestServer {
            base_url: format!("http://127.0.0.1:{}", addr.port()),
            handle,
        })
    }
}

/// Polling helpers for logs emitted after the response was delivered
pub mod wait {
    use std::time::Duration;

    use scopelog_core::{AccessLogData, MemoryLogger};

    /// Wait until `logger` holds at least `count` access logs
    pub async fn access_logs(logger: &MemoryLogger, count: usize) -> Vec<AccessLogData> {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        loop {
            let logs = logger.access_logs();
            if logs.len() >= count || tokio::time::Instant::now() >= deadline {
                return logs;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}
