//! Tracing subscriber setup: console formatter, file layer, and initialisation.
use super::logger::OUTPUT_TARGET;
use super::sink::LogSink;
use super::utils::{format_local_time, strip_ansi};

/// Extracts the `message` field from a [`tracing::Event`].
#[derive(Default)]
struct MessageExtractor {
    message: String,
}

impl tracing::field::Visit for MessageExtractor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        }
    }
}

/// A [`tracing_subscriber::Layer`] that appends all events to the run log
/// with timestamps and ANSI codes stripped.
///
/// Always captures events at `DEBUG` level and above regardless of the
/// console verbosity setting. Events are handed to a [`LogSink`], which holds
/// them until the execution context opens the log file.
#[derive(Debug)]
pub(super) struct FileLayer {
    sink: LogSink,
}

impl FileLayer {
    pub(super) const fn new(sink: LogSink) -> Self {
        Self { sink }
    }
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for FileLayer {
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let level = *event.metadata().level();

        let mut extractor = MessageExtractor::default();
        event.record(&mut extractor);
        let msg = strip_ansi(&extractor.message);
        let ts = format_local_time();

        let line = match level {
            tracing::Level::ERROR => format!("[{ts}] [error] {msg}"),
            tracing::Level::WARN => format!("[{ts}] [warn] {msg}"),
            tracing::Level::DEBUG | tracing::Level::TRACE => format!("[{ts}] [debug] {msg}"),
            tracing::Level::INFO => format!("[{ts}] {msg}"),
        };
        self.sink.write_line(&line);
    }
}

/// A [`tracing_subscriber::fmt::FormatEvent`] that emits embalm-style
/// console output: `embalm error: ...`, `embalm warning: ...`, plain info
/// and indented narration.
struct EmbalmFormatter;

impl<S, N> tracing_subscriber::fmt::FormatEvent<S, N> for EmbalmFormatter
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    N: for<'a> tracing_subscriber::fmt::FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &tracing_subscriber::fmt::FmtContext<'_, S, N>,
        mut writer: tracing_subscriber::fmt::format::Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let level = *event.metadata().level();

        let mut extractor = MessageExtractor::default();
        event.record(&mut extractor);
        let msg = &extractor.message;
        let prog = crate::PROGRAM_NAME;

        match level {
            tracing::Level::ERROR => writeln!(writer, "{prog} \x1b[31merror:\x1b[0m {msg}"),
            tracing::Level::WARN => writeln!(writer, "{prog} \x1b[33mwarning:\x1b[0m {msg}"),
            tracing::Level::INFO => writeln!(writer, "{msg}"),
            _ => writeln!(writer, "  \x1b[2m{msg}\x1b[0m"),
        }
    }
}

/// Initialise the global [`tracing`] subscriber.
///
/// Sets up a console subscriber (warnings and errors on stderr, everything
/// else on stdout, debug events only when `narrate` is set) and a file layer
/// that writes all events including `debug` into `sink`. Command output
/// reaches the console through [`super::Logger`] directly, so its mirror
/// events are kept out of the console layer.
/// Must be called once at program startup, before any logging.
pub fn init_subscriber(narrate: bool, sink: &LogSink) {
    use tracing_subscriber::fmt::writer::MakeWriterExt as _;
    use tracing_subscriber::{
        Layer as _,
        filter::{LevelFilter, filter_fn},
        fmt,
        layer::SubscriberExt as _,
        util::SubscriberInitExt as _,
    };

    let console_level = if narrate {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };

    let make_writer = std::io::stderr
        .with_max_level(tracing::Level::WARN)
        .and(std::io::stdout.with_min_level(tracing::Level::INFO));

    let console_layer = fmt::layer()
        .event_format(EmbalmFormatter)
        .with_writer(make_writer)
        .with_filter(console_level)
        .with_filter(filter_fn(|meta| meta.target() != OUTPUT_TARGET));

    let file_layer = FileLayer::new(sink.clone()).with_filter(LevelFilter::DEBUG);

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();
}
