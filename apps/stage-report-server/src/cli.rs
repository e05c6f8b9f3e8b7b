use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "stage-report-server",
    version,
    about = "Goods-in-transit stage duration reports"
)]
pub struct Args {
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,
    #[arg(long, default_value_t = 8080)]
    pub port: u16,
    /// JSON fixture for the in-memory store; overrides CORE_FIXTURE_PATH.
    #[arg(long)]
    pub fixture: Option<PathBuf>,
    #[arg(long, default_value_t = false)]
    pub print_config: bool,
}
