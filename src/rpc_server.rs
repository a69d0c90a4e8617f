//! pagesnap RPC Server: JSON-RPC over stdin/stdout.
//!
//! Protocol: one JSON object per line (newline-delimited JSON).
//! Request:  {"id":1, "method":"capture.scroll.start", "params":{"tab":1}}
//! Response: {"id":1, "result":{...}} or {"id":1, "error":"..."}
//!
//! Tabs are served by the in-process simulated host; tab 1 holds a long
//! window-scrolled page and tab 2 an app-shell page with an inner scroller.

use std::sync::Arc;
use std::time::Instant;

use serde_json::{json, Value};
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

use pagesnap::app::App;
use pagesnap::host::simulated::{SimulatedHost, SimulatedPage};
use pagesnap::rpc_handler::handle_method;
use pagesnap::types::tab::TabId;

/// Simple rate limiter: max requests per second.
struct RateLimiter {
    window_start: Instant,
    request_count: u32,
    max_per_second: u32,
}

impl RateLimiter {
    fn new(max_per_second: u32) -> Self {
        Self { window_start: Instant::now(), request_count: 0, max_per_second }
    }

    /// Returns true if the request is allowed, false if rate-limited.
    fn check(&mut self) -> bool {
        if self.window_start.elapsed().as_secs() >= 1 {
            self.window_start = Instant::now();
            self.request_count = 0;
        }
        self.request_count += 1;
        self.request_count <= self.max_per_second
    }
}

async fn write_line(stdout: &mut io::Stdout, value: &Value) -> std::io::Result<()> {
    stdout.write_all(format!("{}\n", value).as_bytes()).await?;
    stdout.flush().await
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr; stdout carries the protocol.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let data_dir = match std::env::var("PAGESNAP_DATA_DIR") {
        Ok(dir) => std::path::PathBuf::from(dir),
        Err(_) => pagesnap::platform::get_data_dir(),
    };
    std::fs::create_dir_all(&data_dir)?;
    let db_path = data_dir.join("pagesnap.db");

    let host = Arc::new(SimulatedHost::new());
    host.insert_page(TabId(1), SimulatedPage::new(1280.0, 800.0, 6000.0, 1.0));
    host.insert_page(
        TabId(2),
        SimulatedPage::with_scroll_container(1280.0, 800.0, 4000.0, 2.0).with_fixed_header(64.0),
    );

    let app = App::open(host, &db_path.to_string_lossy(), None)?;

    let mut stdout = io::stdout();
    write_line(&mut stdout, &json!({"event":"ready","version":env!("CARGO_PKG_VERSION")})).await?;

    let mut rate_limiter = RateLimiter::new(200);
    let mut lines = BufReader::new(io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let req: Value = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                write_line(&mut stdout, &json!({"id":null,"error":format!("parse error: {}", e)})).await?;
                continue;
            }
        };
        let id = req.get("id").cloned().unwrap_or(Value::Null);

        if !rate_limiter.check() {
            write_line(&mut stdout, &json!({"id": id, "error": "rate limit exceeded"})).await?;
            continue;
        }

        let method = req.get("method").and_then(|v| v.as_str()).unwrap_or("");
        let params = req.get("params").cloned().unwrap_or(json!({}));

        let response = match handle_method(&app, method, &params).await {
            Ok(val) => json!({"id": id, "result": val}),
            Err(err) => json!({"id": id, "error": err}),
        };
        write_line(&mut stdout, &response).await?;
    }
    Ok(())
}
