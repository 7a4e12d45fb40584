use crate::Result;

/// Initialize tracing for the bot process.
///
/// Safe to call more than once; only the first call installs a subscriber.
pub fn init(service_name: &str) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    // Default: info for our crates, warn for everything else.
    // Can be overridden with `RUST_LOG`.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("warn,wab_core=info,{service_name}=info"))
    });

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(true)
        .try_init();

    Ok(())
}

#[cfg(test)]
mod tests {
    #[test]
    fn init_is_idempotent() {
        assert!(super::init("wab-test").is_ok());
        assert!(super::init("wab-test").is_ok());
    }
}
