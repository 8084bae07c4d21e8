use env_logger::{Builder, Logger, Target};
use log::{LevelFilter, Log, Metadata, Record};
use std::{fs::OpenOptions, io::Write};

use crate::config::MonitorConfig;
use crate::error::Error;

/// Sends every record to the log file and warnings upward to the console.
struct DualLogger {
    file: Logger,
    console: Logger,
}

impl Log for DualLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.file.enabled(metadata) || self.console.enabled(metadata)
    }

    fn log(&self, record: &Record) {
        self.file.log(record);
        self.console.log(record);
    }

    fn flush(&self) {
        self.file.flush();
        self.console.flush();
    }
}

/// Installs the process logger.
///
/// The file at `config.log_file` receives INFO and above (`RUST_LOG` can
/// override this), appended to when `retain_logs` is set and truncated
/// otherwise. Stderr receives WARN and above.
///
/// # Errors
///
/// Returns an error if the log file cannot be opened or a logger is already
/// installed.
pub fn init(config: &MonitorConfig) -> Result<(), Error> {
    let mut options = OpenOptions::new();
    options.create(true);
    if config.retain_logs {
        options.append(true);
    } else {
        options.write(true).truncate(true);
    }
    let file = options.open(&config.log_file)?;

    let file = Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .target(Target::Pipe(Box::new(file)))
        .format(|buf, record| {
            writeln!(
                buf,
                "{} - {} - {} - {}",
                buf.timestamp(),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .build();

    let console = Builder::new()
        .filter_level(LevelFilter::Warn)
        .target(Target::Stderr)
        .format(|buf, record| writeln!(buf, "{} - {}", buf.timestamp(), record.args()))
        .build();

    log::set_max_level(file.filter().max(console.filter()));
    log::set_boxed_logger(Box::new(DualLogger { file, console }))?;
    Ok(())
}
