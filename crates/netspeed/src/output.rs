//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders results in the format selected by `--output`. Table uses
//! `tabled`, structured formats use serde, plain emits one line per
//! result for scripting.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use netspeed_core::{ConnectivityReport, SpeedResult};

use crate::cli::{ColorMode, OutputFormat};

// ── Color helpers ───────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

/// Applies the palette only when color is enabled.
#[derive(Debug, Clone, Copy)]
pub struct Painter {
    enabled: bool,
}

impl Painter {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn good(self, text: &str) -> String {
        if self.enabled { text.green().bold().to_string() } else { text.to_owned() }
    }

    pub fn bad(self, text: &str) -> String {
        if self.enabled { text.red().bold().to_string() } else { text.to_owned() }
    }

    pub fn dim(self, text: &str) -> String {
        if self.enabled { text.dimmed().to_string() } else { text.to_owned() }
    }
}

// ── Rows ────────────────────────────────────────────────────────────

#[derive(Tabled)]
struct ResultRow {
    #[tabled(rename = "Download")]
    download: String,
    #[tabled(rename = "Upload")]
    upload: String,
    #[tabled(rename = "Server")]
    server: String,
    #[tabled(rename = "Latency")]
    latency: String,
    #[tabled(rename = "Route")]
    route: String,
    #[tabled(rename = "Finished")]
    finished: String,
}

/// `94.25 Mbps`: two decimals, decimal megabits.
pub fn mbps(bits_per_second: f64) -> String {
    format!("{:.2} Mbps", bits_per_second / 1_000_000.0)
}

fn result_row(r: &SpeedResult) -> ResultRow {
    let server = match (r.server.sponsor.as_str(), r.server.name.as_str()) {
        ("", name) => name.to_owned(),
        (sponsor, "") => sponsor.to_owned(),
        (sponsor, name) => format!("{sponsor} ({name})"),
    };
    ResultRow {
        download: mbps(r.download_bps),
        upload: mbps(r.upload_bps),
        server,
        latency: r
            .server
            .latency_ms
            .map_or_else(|| "-".into(), |ms| format!("{ms:.1} ms")),
        route: r.via_proxy.clone().unwrap_or_else(|| "direct".into()),
        finished: r.finished_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    }
}

fn result_plain(r: &SpeedResult) -> String {
    format!("{:.2}\t{:.2}", r.download_mbps(), r.upload_mbps())
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render measurement results in the chosen format.
pub fn render_results(format: OutputFormat, results: &[SpeedResult]) -> String {
    render_list(format, results, result_row, result_plain)
}

/// Render a connectivity report in the chosen format.
pub fn render_report(format: OutputFormat, report: &ConnectivityReport, paint: Painter) -> String {
    render_single(
        format,
        report,
        |r| {
            let mut lines = vec![format!("Endpoint  {}", r.endpoint)];
            let direct = if r.direct {
                paint.good("reachable")
            } else {
                paint.bad("unreachable")
            };
            lines.push(format!("Direct    {direct}"));
            match &r.proxy {
                Some(p) => {
                    let verdict = if p.ok {
                        paint.good("ok")
                    } else {
                        paint.bad(p.error.as_deref().unwrap_or("failed"))
                    };
                    lines.push(format!(
                        "Proxy     {} {} {verdict}",
                        p.endpoint,
                        paint.dim(&format!("({})", p.source))
                    ));
                }
                None => lines.push(format!("Proxy     {}", paint.dim("none configured"))),
            }
            lines.join("\n")
        },
        |r| {
            let proxy = r
                .proxy
                .as_ref()
                .map_or("none", |p| if p.ok { "ok" } else { "failed" });
            format!("direct={} proxy={proxy}", r.direct)
        },
    )
}

/// Render a list of serde-serializable + tabled items in the chosen format.
fn render_list<T, R>(
    format: OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    plain_fn: impl Fn(&T) -> String,
) -> String
where
    T: serde::Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            render_table(&rows)
        }
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => data.iter().map(&plain_fn).collect::<Vec<_>>().join("\n"),
    }
}

/// Render a single serde-serializable item in the chosen format.
///
/// Table rendering uses a custom `detail_fn` that returns a pre-formatted
/// string, since single-item views don't use the `Tabled` derive.
pub fn render_single<T>(
    format: OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    plain_fn: impl Fn(&T) -> String,
) -> String
where
    T: serde::Serialize,
{
    match format {
        OutputFormat::Table => detail_fn(data),
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => plain_fn(data),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Format-specific renderers ────────────────────────────────────────

fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

fn render_json<T: serde::Serialize + ?Sized>(data: &T, compact: bool) -> String {
    let rendered = if compact {
        serde_json::to_string(data)
    } else {
        serde_json::to_string_pretty(data)
    };
    rendered.expect("serialization should not fail")
}

fn render_yaml<T: serde::Serialize + ?Sized>(data: &T) -> String {
    serde_yaml::to_string(data).expect("serialization should not fail")
}
