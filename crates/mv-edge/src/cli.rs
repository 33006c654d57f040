use clap::{Parser, Subcommand};

/// MarketVoice — a conversational voice assistant backend for market-data questions.
#[derive(Debug, Parser)]
#[command(name = "marketvoice", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the edge server (default when no subcommand is given).
    Serve,
    /// Run diagnostic checks against the current configuration.
    Doctor,
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Print version information.
    Version,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Parse the config file and report any errors.
    Validate,
    /// Dump the resolved configuration (with defaults) as TOML.
    Show,
}

/// Load configuration from the path named by `MV_CONFIG` (or
/// `config.toml` by default). A missing file falls back to all-defaults,
/// matching the teacher's permissive `load_config` behavior.
pub fn load_config() -> anyhow::Result<(mv_domain::config::Config, String)> {
    let config_path = std::env::var("MV_CONFIG").unwrap_or_else(|_| "config.toml".into());

    let config = if std::path::Path::new(&config_path).exists() {
        let raw = std::fs::read_to_string(&config_path)
            .map_err(|e| anyhow::anyhow!("reading {config_path}: {e}"))?;
        mv_domain::config::Config::load_from_str(&raw)
            .map_err(|e| anyhow::anyhow!("parsing {config_path}: {e}"))?
    } else {
        mv_domain::config::Config::default()
    };

    Ok((config, config_path))
}

pub mod config {
    use mv_domain::config::{Config, ConfigSeverity};

    /// Parse and validate the config, printing any issues. Returns
    /// `true` when there are no error-severity issues.
    pub fn validate(config: &Config, config_path: &str) -> bool {
        let issues = config.validate();
        if issues.is_empty() {
            println!("Config OK ({config_path})");
            return true;
        }
        let error_count = issues.iter().filter(|i| i.severity == ConfigSeverity::Error).count();
        let warning_count = issues.len() - error_count;
        for issue in &issues {
            println!("{issue}");
        }
        println!("\n{error_count} error(s), {warning_count} warning(s) in {config_path}");
        error_count == 0
    }

    /// Dump the resolved config (with all defaults filled in) as TOML.
    pub fn show(config: &Config) {
        match toml::to_string_pretty(config) {
            Ok(output) => print!("{output}"),
            Err(e) => {
                eprintln!("Failed to serialize config: {e}");
                std::process::exit(1);
            }
        }
    }
}

pub mod doctor {
    use mv_domain::config::{Config, ConfigSeverity};

    /// Run diagnostic checks and print a summary. Returns `Ok(true)` when
    /// every check passes.
    pub fn run(config: &Config, config_path: &str) -> anyhow::Result<bool> {
        println!("marketvoice doctor");
        println!("===================\n");

        let mut all_passed = true;

        check_config_file(config_path, &mut all_passed);
        check_config_validation(config, &mut all_passed);
        check_state_dir(config, &mut all_passed);
        check_transcript_root(config, &mut all_passed);

        println!();
        if all_passed {
            println!("All checks passed.");
        } else {
            println!("Some checks failed. Review the output above.");
        }

        Ok(all_passed)
    }

    fn check_config_file(config_path: &str, all_passed: &mut bool) {
        let exists = std::path::Path::new(config_path).exists();
        print_check(
            "Config file exists",
            exists,
            if exists { config_path.to_owned() } else { format!("{config_path} not found (using defaults)") },
        );
        if !exists {
            *all_passed = false;
        }
    }

    fn check_config_validation(config: &Config, all_passed: &mut bool) {
        let issues = config.validate();
        let error_count = issues.iter().filter(|e| e.severity == ConfigSeverity::Error).count();
        if issues.is_empty() {
            print_check("Config validation", true, "no issues".into());
        } else {
            print_check(
                "Config validation",
                error_count == 0,
                format!("{} issue(s) ({} error(s))", issues.len(), error_count),
            );
            for issue in &issues {
                println!("      {issue}");
            }
            if error_count > 0 {
                *all_passed = false;
            }
        }
    }

    fn check_state_dir(config: &Config, all_passed: &mut bool) {
        let result = std::fs::create_dir_all(&config.store.state_path);
        print_check(
            "Store state directory writable",
            result.is_ok(),
            config.store.state_path.display().to_string(),
        );
        if result.is_err() {
            *all_passed = false;
        }
    }

    fn check_transcript_root(config: &Config, all_passed: &mut bool) {
        let result = std::fs::create_dir_all(&config.logging.transcript_root);
        print_check(
            "Transcript root writable",
            result.is_ok(),
            config.logging.transcript_root.display().to_string(),
        );
        if result.is_err() {
            *all_passed = false;
        }
    }

    fn print_check(name: &str, passed: bool, detail: String) {
        let mark = if passed { "OK  " } else { "FAIL" };
        println!("  [{mark}] {name}: {detail}");
    }
}
