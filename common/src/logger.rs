use redox_log::{OutputBuilder, RedoxLogger};

/// Stderr level when no `-v` was given.
pub fn output_level() -> log::LevelFilter {
    log::LevelFilter::Warn
}

pub fn file_level() -> log::LevelFilter {
    log::LevelFilter::Debug
}

/// Maps the number of `-v` flags to a stderr level, starting from [output_level].
pub fn verbosity_level(occurrences: u64) -> log::LevelFilter {
    match occurrences {
        0 => output_level(),
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    }
}

/// Configures logging for a single tool or driver.
///
/// Output always goes to stderr. On Redox, a plain and an ANSI log file named after
/// `logfile_base` are created in the logging scheme as well.
#[cfg_attr(not(target_os = "redox"), allow(unused_variables, unused_mut))]
pub fn setup_logging(
    category: &str,
    subcategory: &str,
    logfile_base: &str,
    output_level: log::LevelFilter,
    file_level: log::LevelFilter,
) {
    let mut logger = RedoxLogger::new().with_output(
        OutputBuilder::stderr()
            .with_filter(output_level)
            .with_ansi_escape_codes()
            .flush_on_newline(true)
            .build(),
    );

    #[cfg(target_os = "redox")]
    for (suffix, ansi) in [("log", false), ("ansi.log", true)] {
        let name = format!("{logfile_base}.{suffix}");
        match OutputBuilder::in_redox_logging_scheme(category, subcategory, name.clone()) {
            Ok(builder) => {
                let builder = builder.with_filter(file_level).flush_on_newline(true);
                let builder = if ansi {
                    builder.with_ansi_escape_codes()
                } else {
                    builder
                };
                logger = logger.with_output(builder.build());
            }
            Err(error) => eprintln!("Failed to create {name}: {error}"),
        }
    }

    if let Err(error) = logger.enable() {
        eprintln!("Failed to set default logger: {error}");
    }
}
