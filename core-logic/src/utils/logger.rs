use chrono::Local;
use nu_ansi_term::{Color, Style};
use std::fmt;
use std::path::Path;
use tracing::{Event, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{format::Writer, FmtContext, FormatEvent, FormatFields},
    prelude::*,
    registry::LookupSpan,
    Layer,
};

/// Target for one line per finished transfer.
pub const TRANSFER_TARGET: &str = "transfer_result";
/// Target for session and schedule lifecycle lines.
pub const SESSION_TARGET: &str = "session";

/// Installs the file + console subscriber. Keep the guard alive for the
/// lifetime of the process or buffered file lines are lost.
pub fn setup_logger(log_dir: impl AsRef<Path>) -> Option<WorkerGuard> {
    let log_dir = log_dir.as_ref();
    if let Err(e) = std::fs::create_dir_all(log_dir) {
        eprintln!("Cannot create log directory {}: {}", log_dir.display(), e);
        return None;
    }

    let file_appender = tracing_appender::rolling::hourly(log_dir, "dispatch");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_filter = tracing_subscriber::filter::Targets::new()
        .with_target(TRANSFER_TARGET, tracing::Level::INFO)
        .with_target(SESSION_TARGET, tracing::Level::INFO)
        .with_default(tracing::Level::INFO);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .event_format(FileFormatter)
        .with_filter(file_filter);

    let console_filter = tracing_subscriber::filter::Targets::new()
        .with_target(TRANSFER_TARGET, tracing::Level::INFO)
        .with_target(SESSION_TARGET, tracing::Level::INFO)
        .with_default(tracing::Level::WARN);

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(true)
        .event_format(TerminalFormatter)
        .with_filter(console_filter);

    if tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .is_err()
    {
        return None;
    }

    Some(guard)
}

// --- Formatters ---

/// Collects the message and any extra fields as `key=value`.
#[derive(Default)]
struct EventVisitor {
    message: String,
    fields: Vec<String>,
}

impl tracing::field::Visit for EventVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else {
            self.fields.push(format!("{}={:?}", field.name(), value));
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.push(format!("{}={}", field.name(), value));
        }
    }
}

impl EventVisitor {
    fn line(&self) -> String {
        if self.fields.is_empty() {
            self.message.clone()
        } else {
            format!("{} {}", self.message, self.fields.join(" "))
        }
    }
}

pub struct TerminalFormatter;

impl<S, N> FormatEvent<S, N> for TerminalFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);
        let msg = visitor.line();

        let colored_msg = if msg.contains("SUCCESS") {
            let green = Style::new().fg(Color::LightGreen).bold();
            msg.replace("SUCCESS", &green.paint("SUCCESS").to_string())
        } else if msg.contains("FAILED") {
            let red = Style::new().fg(Color::LightRed).bold();
            msg.replace("FAILED", &red.paint("FAILED").to_string())
        } else if *event.metadata().level() <= tracing::Level::WARN {
            Style::new().fg(Color::Yellow).paint(msg).to_string()
        } else {
            msg
        };

        let time = Style::new()
            .dimmed()
            .paint(Local::now().format("%H:%M:%S").to_string());
        writeln!(writer, "{} {}", time, colored_msg)
    }
}

pub struct FileFormatter;

impl<S, N> FormatEvent<S, N> for FileFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        let meta = event.metadata();

        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);
        writeln!(
            writer,
            "{} [{}] {}: {}",
            timestamp,
            meta.level(),
            meta.target(),
            visitor.line()
        )
    }
}
