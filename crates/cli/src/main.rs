use std::path::PathBuf;

use anyhow::Context;
use broadsheet_core::{Config, Converter, Outcome, Verbosity, read_stdin, url_lines};
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod echo;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Convert news article URLs read from stdin into PDF files
#[derive(Parser, Debug)]
#[command(name = "broadsheet")]
#[command(version)]
#[command(about = "Convert news article URLs read from stdin into PDF files", long_about = None)]
struct Args {
    /// Base directory output files are written under
    #[arg(short, long, default_value = ".", value_name = "DIR")]
    dir: PathBuf,

    /// HTTP(S) proxy, credentials may be given as user:password@
    #[arg(short = 'p', long, value_name = "URL")]
    http_proxy: Option<String>,

    /// Leave out the thumbnail, the webpage link and other imagery
    #[arg(short, long)]
    text_only: bool,

    /// Prefix printed before each output path
    #[arg(long, default_value = "", value_name = "PREFIX")]
    url_prefix: String,

    /// Print progress and human-readable results
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Print nothing on stdout
    #[arg(short, long)]
    quiet: bool,

    /// Directory holding MiloTE.ttf, MiloTE-inclined.ttf and an optional fallback.ttf
    #[arg(long, value_name = "DIR")]
    fonts: Option<PathBuf>,

    /// Directory holding logo.png and audio.png
    #[arg(long, value_name = "DIR")]
    assets: Option<PathBuf>,

    /// HTTP timeout in seconds
    #[arg(long, default_value = "30", value_name = "SECS")]
    timeout: u64,

    /// Custom User-Agent for HTTP requests
    #[arg(long, value_name = "UA")]
    user_agent: Option<String>,
}

impl Args {
    fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else if self.verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Normal
        }
    }

    fn config(&self) -> Config {
        let mut builder = Config::builder()
            .output_dir(&self.dir)
            .text_only(self.text_only)
            .url_prefix(&self.url_prefix)
            .verbosity(self.verbosity())
            .timeout(self.timeout)
            .proxy(self.http_proxy.clone())
            .font_dir(self.fonts.clone());

        if let Some(ua) = &self.user_agent {
            builder = builder.user_agent(ua);
        }
        if let Some(dir) = &self.assets {
            builder = builder.asset_dir(Some(dir.clone()));
        }
        builder.build()
    }
}

/// Diagnostics go to stderr; `RUST_LOG` overrides the verbosity default.
fn init_tracing(verbosity: Verbosity) {
    let default = match verbosity {
        Verbosity::Quiet | Verbosity::Normal => "error",
        Verbosity::Verbose => "info",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Args::parse().config();
    let verbosity = config.verbosity;
    init_tracing(verbosity);

    let input = read_stdin().context("Failed to read from stdin")?;
    let urls: Vec<&str> = url_lines(&input).collect();
    tracing::debug!(count = urls.len(), "read URL list");
    if urls.is_empty() {
        if verbosity == Verbosity::Verbose {
            println!("<stdin> is empty.");
        }
        return Ok(());
    }

    let converter = Converter::new(config).context("Failed to set up the converter")?;

    if verbosity == Verbosity::Verbose {
        echo::print_banner();
        println!("Ctrl + Click to open file.");
    }

    let (mut converted, mut skipped, mut failed) = (0, 0, 0);
    for (index, url) in urls.iter().enumerate() {
        if verbosity == Verbosity::Verbose {
            echo::print_step(index + 1, urls.len(), url);
        }

        match converter.convert(url).await {
            Outcome::Converted { display, .. } => {
                converted += 1;
                match verbosity {
                    Verbosity::Quiet => {}
                    Verbosity::Normal => println!("{display}"),
                    Verbosity::Verbose => {
                        println!("Saved {display}");
                        echo::print_success("Converted");
                    }
                }
            }
            Outcome::NotAnArticle => {
                skipped += 1;
                if verbosity == Verbosity::Verbose {
                    echo::print_warning("Not an article URL, skipped");
                }
            }
            Outcome::Failed { error } => {
                failed += 1;
                echo::print_error(&format!("{url} [{}] {error}", error.stage()));
            }
        }
    }

    if verbosity == Verbosity::Verbose {
        echo::print_summary(converted, skipped, failed);
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} URLs failed", urls.len());
    }
    Ok(())
}
