use clap::Parser;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Stop after this many seconds instead of running until the feed gives up.
    #[arg(long)]
    pub duration: Option<u64>,

    /// Overrides `[logging] level` from the config file.
    #[arg(short, long)]
    pub logging_level: Option<log::LevelFilter>,

    #[arg(long)]
    pub config_file: std::path::PathBuf,
}

impl Cli {
    #[must_use]
    pub fn resolve_logging_level(&self, configured: Option<log::LevelFilter>) -> log::LevelFilter {
        self.logging_level
            .or(configured)
            .unwrap_or(log::LevelFilter::Info)
    }
}
