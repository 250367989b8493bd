use clap::Parser;

/// Filewise - natural-language file management assistant
#[derive(Parser, Debug, Clone)]
#[command(name = "filewise")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Run a single request (free text or bracket command) and exit
    #[arg(short, long)]
    pub command: Option<String>,

    /// Model name to use
    #[arg(short, long, default_value = "gpt-4o-mini")]
    pub model: String,

    /// API base URL (e.g., http://localhost:8080/v1 for llama-server)
    #[arg(short = 'u', long, default_value = "http://localhost:8080/v1")]
    pub url: String,

    /// API key (use "sk-no-key-required" for local servers)
    #[arg(short = 'k', long, default_value = "sk-no-key-required")]
    pub api_key: String,

    /// Number of retries for failed model calls
    #[arg(long, default_value = "3")]
    pub retries: usize,

    /// Skip the model layer entirely; input must be bracket commands
    #[arg(long)]
    pub offline: bool,

    /// Answer yes to every confirmation prompt
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    pub fn parse_args() -> Self {
        Config::parse()
    }
}
