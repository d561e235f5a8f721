// Copyright 2026 Simo Sorce
// See LICENSE.txt file for terms

//! Store tracing, configured from the environment when the library loads

use std::fs::OpenOptions;
use std::str::FromStr;

use simplelog::{ConfigBuilder, LevelFilter, SimpleLogger, WriteLogger};

#[used]
#[cfg_attr(target_os = "linux", unsafe(link_section = ".init_array"))]
pub static INITIALIZE: extern "C" fn() = pemstore_log_init;

/// Level named by PEMSTORE_TRACE_LEVEL
///
/// Unset means errors only, a value that is not a level name means
/// everything.
fn trace_level(value: Option<&str>) -> LevelFilter {
    match value {
        None => LevelFilter::Error,
        Some(v) => LevelFilter::from_str(v).unwrap_or(LevelFilter::Trace),
    }
}

/// Sets up tracing of the registry, the loaders and the crypto sessions
///
/// PEMSTORE_TRACE selects the destination: `stdout`, or the path of a
/// file that the traces are appended to, so several processes using
/// the same store can share one trace. With the variable unset nothing
/// is traced. Only records from pemstore modules are emitted.
///
/// Failures, like a file that cannot be opened or a logger installed by
/// the host application, are ignored and leave tracing off.
#[unsafe(no_mangle)]
pub extern "C" fn pemstore_log_init() {
    let target = match std::env::var("PEMSTORE_TRACE") {
        Ok(t) => t,
        Err(_) => return,
    };
    let level =
        trace_level(std::env::var("PEMSTORE_TRACE_LEVEL").ok().as_deref());
    let config = ConfigBuilder::new()
        .add_filter_allow_str("pemstore")
        .build();
    if target == "stdout" {
        let _ = SimpleLogger::init(level, config);
        return;
    }
    if let Ok(file) = OpenOptions::new().create(true).append(true).open(&target)
    {
        let _ = WriteLogger::init(level, config, file);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trace_levels() {
        assert_eq!(trace_level(None), LevelFilter::Error);
        assert_eq!(trace_level(Some("off")), LevelFilter::Off);
        assert_eq!(trace_level(Some("warn")), LevelFilter::Warn);
        assert_eq!(trace_level(Some("DEBUG")), LevelFilter::Debug);
        assert_eq!(trace_level(Some("verbose")), LevelFilter::Trace);
    }

    #[test]
    fn init_without_target() {
        pemstore_log_init();
    }
}
