use log::LevelFilter;

/// Verbosity levels accepted on the command line
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Nothing = 0,
    User = 1,
    Error = 2,
    Warning = 3,
    Info = 4,
    Debug = 5,
    All = 6,
}

impl LogLevel {
    /// Create a LogLevel from an integer
    pub fn from_i32(level: i32) -> Self {
        match level {
            0 => LogLevel::Nothing,
            1 => LogLevel::User,
            2 => LogLevel::Error,
            3 => LogLevel::Warning,
            4 => LogLevel::Info,
            5 => LogLevel::Debug,
            6 => LogLevel::All,
            _ => LogLevel::Info,
        }
    }

    pub fn as_i32(&self) -> i32 {
        *self as i32
    }

    /// Level filter for the `log` facade
    pub fn filter(&self) -> LevelFilter {
        match self {
            LogLevel::Nothing => LevelFilter::Off,
            LogLevel::User | LogLevel::Error => LevelFilter::Error,
            LogLevel::Warning => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::All => LevelFilter::Trace,
        }
    }

    /// Level for a count of `-v` flags, starting from warnings
    pub fn from_verbosity(count: u8) -> Self {
        let level = (LogLevel::Warning.as_i32() + count as i32).min(LogLevel::All.as_i32());
        Self::from_i32(level)
    }
}

/// Install the env_logger backend
///
/// `RUST_LOG`, when set, takes precedence over `level`. Calling this more
/// than once is harmless; later calls are ignored.
pub fn init_logging(level: LogLevel) {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(level.filter());
    if let Ok(spec) = std::env::var("RUST_LOG") {
        builder.parse_filters(&spec);
    }
    if builder.try_init().is_err() {
        log::debug!("logger already initialized");
    }
}
