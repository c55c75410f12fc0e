//! Logger module
//!
//! Access and error logging for the server: stdout/stderr by default, file
//! targets when configured, access entries in combined, common, or JSON
//! format.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::net::SocketAddr;
use std::sync::{Mutex, OnceLock};

use chrono::Local;

use crate::config::Config;

static LOG_WRITER: OnceLock<LogWriter> = OnceLock::new();

/// Log output target
enum LogTarget {
    Stdout,
    Stderr,
    File(Mutex<File>),
}

impl LogTarget {
    fn open(path: Option<&str>, errors: bool) -> io::Result<Self> {
        match path {
            Some(path) => {
                let file = OpenOptions::new().create(true).append(true).open(path)?;
                Ok(Self::File(Mutex::new(file)))
            }
            None if errors => Ok(Self::Stderr),
            None => Ok(Self::Stdout),
        }
    }

    fn write_line(&self, message: &str) {
        match self {
            Self::Stdout => println!("{message}"),
            Self::Stderr => eprintln!("{message}"),
            Self::File(file) => {
                if let Ok(mut file) = file.lock() {
                    // A failed log write must never affect request handling
                    let _ = writeln!(file, "{message}");
                }
            }
        }
    }
}

/// Thread-safe log writer with separate access and error targets
struct LogWriter {
    access: LogTarget,
    error: LogTarget,
}

/// Initialize the logger from configuration.
///
/// Should be called once at application startup; later calls keep the first
/// configuration.
pub fn init(config: &Config) -> io::Result<()> {
    let writer = LogWriter {
        access: LogTarget::open(config.logging.access_log_file.as_deref(), false)?,
        error: LogTarget::open(config.logging.error_log_file.as_deref(), true)?,
    };
    let _ = LOG_WRITER.set(writer);
    Ok(())
}

fn write_info(message: &str) {
    match LOG_WRITER.get() {
        Some(writer) => writer.access.write_line(message),
        None => println!("{message}"),
    }
}

fn write_error(message: &str) {
    match LOG_WRITER.get() {
        Some(writer) => writer.error.write_line(message),
        None => eprintln!("{message}"),
    }
}

/// Access log entry containing request/response information
#[derive(Debug, Clone)]
pub struct AccessLogEntry {
    pub remote_addr: String,
    pub time: chrono::DateTime<Local>,
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub http_version: String,
    pub status: u16,
    pub body_bytes: usize,
    pub referer: Option<String>,
    pub user_agent: Option<String>,
    pub request_time_us: u64,
}

impl AccessLogEntry {
    /// Format the entry according to the configured format
    pub fn format(&self, format: &str) -> String {
        match format {
            "common" => self.format_common(),
            "json" => self.format_json(),
            _ => self.format_combined(),
        }
    }

    fn request_line(&self) -> String {
        let query = self
            .query
            .as_ref()
            .map(|q| format!("?{q}"))
            .unwrap_or_default();
        format!(
            "{} {}{} HTTP/{}",
            self.method, self.path, query, self.http_version
        )
    }

    /// Apache/Nginx combined log format
    fn format_combined(&self) -> String {
        format!(
            "{} - - [{}] \"{}\" {} {} \"{}\" \"{}\"",
            self.remote_addr,
            self.time.format("%d/%b/%Y:%H:%M:%S %z"),
            self.request_line(),
            self.status,
            self.body_bytes,
            self.referer.as_deref().unwrap_or("-"),
            self.user_agent.as_deref().unwrap_or("-"),
        )
    }

    /// Common Log Format (CLF)
    fn format_common(&self) -> String {
        format!(
            "{} - - [{}] \"{}\" {} {}",
            self.remote_addr,
            self.time.format("%d/%b/%Y:%H:%M:%S %z"),
            self.request_line(),
            self.status,
            self.body_bytes,
        )
    }

    /// JSON structured log format
    fn format_json(&self) -> String {
        let query = json_string_or_null(self.query.as_deref());
        let referer = json_string_or_null(self.referer.as_deref());
        let user_agent = json_string_or_null(self.user_agent.as_deref());

        format!(
            r#"{{"remote_addr":"{}","time":"{}","method":"{}","path":"{}","query":{},"http_version":"{}","status":{},"body_bytes":{},"referer":{},"user_agent":{},"request_time_us":{}}}"#,
            escape_json(&self.remote_addr),
            self.time.to_rfc3339(),
            escape_json(&self.method),
            escape_json(&self.path),
            query,
            escape_json(&self.http_version),
            self.status,
            self.body_bytes,
            referer,
            user_agent,
            self.request_time_us,
        )
    }
}

fn json_string_or_null(value: Option<&str>) -> String {
    value.map_or_else(
        || "null".to_string(),
        |v| format!("\"{}\"", escape_json(v)),
    )
}

fn escape_json(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            c if c.is_control() => escaped.push_str(&format!("\\u{:04x}", c as u32)),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    write_info(&entry.format(format));
}

pub fn log_server_start(addr: &SocketAddr, config: &Config) {
    write_info("======================================");
    write_info("Async server started successfully");
    write_info(&format!("Listening on: http://{addr}"));
    write_info(&format!("Log level: {}", config.logging.level));
    write_info(&format!(
        "Asset cache TTL: {}s (sweep every {}s)",
        config.cache.ttl_secs, config.cache.sweep_interval_secs
    ));
    if let Some(workers) = config.server.workers {
        write_info(&format!("Worker threads: {workers}"));
    }
    if let Some(ref path) = config.logging.access_log_file {
        write_info(&format!("Access log: {path}"));
    }
    if let Some(ref path) = config.logging.error_log_file {
        write_info(&format!("Error log: {path}"));
    }
    write_info("Using Tokio runtime for concurrency");
    write_info("======================================\n");
}

pub fn log_connection_accepted(peer_addr: &SocketAddr) {
    write_info(&format!("[Connection] Accepted from: {peer_addr}"));
}

pub fn log_connection_error(err: &impl std::fmt::Debug) {
    write_error(&format!("[ERROR] Failed to serve connection: {err:?}"));
}

pub fn log_error(message: &str) {
    write_error(&format!("[ERROR] {message}"));
}

pub fn log_warning(message: &str) {
    write_error(&format!("[WARN] {message}"));
}

pub fn log_response(name: &str, size: usize) {
    write_info(&format!("[Response] 200 {name} ({size} bytes)"));
}

pub fn log_headers_count(count: usize, show: bool) {
    if show {
        write_info(&format!("[Headers] Count: {count}"));
    }
}

pub fn log_cache_sweep(evicted: usize) {
    write_info(&format!("[Cache] Sweep evicted {evicted} expired entries"));
}

pub fn log_shutdown_signal(signal_name: &str) {
    write_info(&format!(
        "[Signal] {signal_name} received, initiating graceful shutdown"
    ));
}

pub fn log_shutdown() {
    write_info("Server stopped");
}
