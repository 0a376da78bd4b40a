use crate::config::toml_config::{CrmConfig, LoggingConfig};
use crate::utils::error::Result;
use crate::utils::validation::Validate;
use clap::{Parser, Subcommand};

#[derive(Debug, Clone, Parser)]
#[command(name = "mini-crm")]
#[command(about = "A small contact manager for sales leads")]
pub struct CliConfig {
    /// Directory holding leads.json (overrides the config file)
    #[arg(long)]
    pub data_dir: Option<String>,

    /// Path to a TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Add a new lead
    Add {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        company: String,
        #[arg(long)]
        email: String,
        /// Initial stage (new, contacted, qualified, converted, lost)
        #[arg(long)]
        stage: Option<String>,
    },
    /// List all leads
    List,
    /// Search leads by name, company or e-mail
    Search { query: String },
    /// Export leads to CSV
    Export {
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Show lead counts per stage
    Stats,
    /// Move a lead to another stage
    Stage { index: usize, stage: String },
    /// Delete a lead
    Delete { index: usize },
    /// Check that the lead database is readable
    Check,
}

impl CliConfig {
    /// 合併設定檔與命令列參數；命令列優先
    pub fn resolve(&self) -> Result<CrmConfig> {
        let mut config = match &self.config {
            Some(path) => CrmConfig::from_file(path)?,
            None => CrmConfig::default(),
        };

        if let Some(data_dir) = &self.data_dir {
            config.storage.data_dir = data_dir.clone();
        }
        if self.verbose {
            config.logging.get_or_insert_with(LoggingConfig::default).verbose = Some(true);
        }

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_subcommands() {
        let cli = CliConfig::parse_from([
            "mini-crm", "add", "--name", "Ana", "--email", "ana@x.com",
        ]);
        match cli.command {
            Command::Add {
                name,
                company,
                email,
                stage,
            } => {
                assert_eq!(name, "Ana");
                assert_eq!(company, "");
                assert_eq!(email, "ana@x.com");
                assert_eq!(stage, None);
            }
            other => panic!("unexpected command: {:?}", other),
        }

        let cli = CliConfig::parse_from(["mini-crm", "--data-dir", "/tmp/crm", "stage", "2", "lost"]);
        assert_eq!(cli.data_dir.as_deref(), Some("/tmp/crm"));
        assert!(matches!(cli.command, Command::Stage { index: 2, ref stage } if stage == "lost"));
    }

    #[test]
    fn test_resolve_defaults() {
        let cli = CliConfig::parse_from(["mini-crm", "list"]);
        let config = cli.resolve().unwrap();
        assert_eq!(config.data_dir(), "data");
        assert!(!config.verbose());
    }

    #[test]
    fn test_cli_overrides_config_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[storage]\ndata_dir = \"from-file\"\nexport_path = \"x.csv\"\n")
            .unwrap();
        let path = temp_file.path().to_str().unwrap().to_string();

        let cli = CliConfig::parse_from(["mini-crm", "--config", path.as_str(), "stats"]);
        let config = cli.resolve().unwrap();
        assert_eq!(config.data_dir(), "from-file");
        assert_eq!(config.export_path(), Some("x.csv"));

        let cli = CliConfig::parse_from([
            "mini-crm", "-v", "--config", path.as_str(), "--data-dir", "from-cli", "stats",
        ]);
        let config = cli.resolve().unwrap();
        assert_eq!(config.data_dir(), "from-cli");
        assert!(config.verbose());
    }

    #[test]
    fn test_verbose_from_config_file_without_flag() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[logging]\nverbose = true\n")
            .unwrap();
        let path = temp_file.path().to_str().unwrap().to_string();

        let cli = CliConfig::parse_from(["mini-crm", "--config", path.as_str(), "list"]);
        assert!(!cli.verbose);
        assert!(cli.resolve().unwrap().verbose());

        let mut quiet_file = NamedTempFile::new().unwrap();
        quiet_file
            .write_all(b"[logging]\nverbose = false\n")
            .unwrap();
        let quiet_path = quiet_file.path().to_str().unwrap().to_string();

        let cli = CliConfig::parse_from(["mini-crm", "-v", "--config", quiet_path.as_str(), "list"]);
        assert!(cli.resolve().unwrap().verbose());
    }

    #[test]
    fn test_resolve_rejects_empty_data_dir() {
        let cli = CliConfig::parse_from(["mini-crm", "--data-dir", "", "list"]);
        assert!(cli.resolve().is_err());
    }
}
