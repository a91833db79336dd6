use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "regexcop", version, about = "Find redundant constructs in Ruby regexp literals")]
pub struct Args {
    /// Files or directories to lint
    #[arg(default_value = ".")]
    pub paths: Vec<PathBuf>,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, default_value = "text", value_parser = ["text", "json"])]
    pub format: String,

    /// Run only the specified cops (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub only: Vec<String>,

    /// Exclude the specified cops (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub except: Vec<String>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// List all registered cop names, one per line, then exit
    #[arg(long)]
    pub list_cops: bool,

    /// Read source from stdin, use PATH for display and config matching
    #[arg(long, value_name = "PATH")]
    pub stdin: Option<PathBuf>,

    /// Stop after first file with offenses
    #[arg(short = 'F', long)]
    pub fail_fast: bool,

    /// Autocorrect offenses in place (prints corrected source with --stdin)
    #[arg(short = 'a', long = "autocorrect")]
    pub autocorrect: bool,
}

impl Args {
    /// Whether `--only`/`--except` let `name` run.
    pub fn selects(&self, name: &str) -> bool {
        if !self.only.is_empty() && !self.only.iter().any(|n| n == name) {
            return false;
        }
        !self.except.iter().any(|n| n == name)
    }
}
