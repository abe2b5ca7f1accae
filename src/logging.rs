use anyhow::Result;
use tracing::Level;
use tracing_subscriber::fmt;

/// One-shot CLI runs stay quiet unless `verbose`; the server always logs.
pub fn init(verbose: bool, serving: bool) -> Result<()> {
    if !verbose && !serving {
        return Ok(());
    }
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let _ = fmt()
        .with_max_level(level)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .try_init();
    Ok(())
}
