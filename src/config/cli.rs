use clap::Parser;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "host-rotation")]
#[command(about = "Telegram bot that rotates group hosting duty among a fixed roster")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: String,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    /// Tick on a short fixed interval instead of the weekly schedule
    #[arg(long)]
    pub debug: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub json_logs: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flags() {
        let cli = CliConfig::parse_from(["host-rotation", "--config", "bot.toml", "-v", "--debug"]);
        assert_eq!(cli.config, "bot.toml");
        assert!(cli.verbose);
        assert!(cli.debug);
        assert!(!cli.json_logs);
    }

    #[test]
    fn test_config_is_required() {
        assert!(CliConfig::try_parse_from(["host-rotation"]).is_err());
    }
}
