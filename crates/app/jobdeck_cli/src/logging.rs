use flexi_logger::{DeferredNow, Logger, Record};

use crate::Error;

/// Plain output for info-level lines; level-prefixed otherwise.
fn cli_format(
    w: &mut dyn std::io::Write,
    _now: &mut DeferredNow,
    record: &Record,
) -> std::io::Result<()> {
    match record.level() {
        log::Level::Info => write!(w, "{}", record.args()),
        level => write!(w, "{level}: {}", record.args()),
    }
}

pub fn init() -> Result<(), Error> {
    Logger::try_with_env_or_str("info")?
        .format(cli_format)
        .log_to_stdout()
        .start()?;

    Ok(())
}
