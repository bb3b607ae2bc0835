//! Process-wide configuration.
//!
//! A [`Config`] is built once at start-up and then only borrowed: every stage of
//! the pipeline reads the same values and none of them can change mid-batch.
//!
//! # Example
//!
//! ```rust
//! use broadsheet_core::{Config, Verbosity};
//!
//! let config = Config::builder()
//!     .output_dir("out")
//!     .text_only(true)
//!     .verbosity(Verbosity::Verbose)
//!     .build();
//! assert!(config.text_only);
//! ```

use std::path::PathBuf;

/// HTTP client configuration for fetching article pages and thumbnails.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Request timeout in seconds.
    pub timeout: u64,
    /// User-Agent header sent with every request.
    pub user_agent: String,
    /// Optional HTTP(S) proxy URL. Credentials embedded as `user:pass@` are
    /// sent as proxy basic authentication.
    pub proxy: Option<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { timeout: 30, user_agent: "Mozilla/5.0".to_string(), proxy: None }
    }
}

/// How much the binary reports on standard output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Nothing on stdout.
    Quiet,
    /// One bare output path per converted URL.
    #[default]
    Normal,
    /// Human-readable lines.
    Verbose,
}

/// The publication whose articles are converted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publication {
    /// Display name, used as logo alt text.
    pub name: String,
    /// Web host article URLs must live on.
    pub host: String,
    /// Home page the masthead links to.
    pub home: String,
}

impl Publication {
    pub fn economist() -> Self {
        Self {
            name: "The Economist".to_string(),
            host: "www.economist.com".to_string(),
            home: "https://www.economist.com/".to_string(),
        }
    }
}

impl Default for Publication {
    fn default() -> Self {
        Self::economist()
    }
}

/// Immutable configuration shared by every URL of a batch.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base directory output files are written under.
    pub output_dir: PathBuf,

    /// Omit imagery and the webpage link, mark the title "(Text Only)".
    pub text_only: bool,

    /// Prefix prepended to the relative output path when it is displayed.
    pub url_prefix: String,

    /// Reporting level of the binary.
    pub verbosity: Verbosity,

    /// HTTP settings.
    pub fetch: FetchConfig,

    /// Directory holding the TrueType programs. `None` uses the standard PDF fonts.
    pub font_dir: Option<PathBuf>,

    /// Directory holding `logo.png` and `audio.png`.
    pub asset_dir: Option<PathBuf>,

    /// Publication the article URLs belong to.
    pub publication: Publication,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::new(),
            text_only: false,
            url_prefix: String::new(),
            verbosity: Verbosity::Normal,
            fetch: FetchConfig::default(),
            font_dir: None,
            asset_dir: default_asset_dir(),
            publication: Publication::default(),
        }
    }
}

impl Config {
    /// Creates a new builder for Config.
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }
}

/// Per-user asset directory, used only when it already exists.
fn default_asset_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("broadsheet")).filter(|dir| dir.is_dir())
}

/// Builder for Config.
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self { config: Config::default() }
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn text_only(mut self, value: bool) -> Self {
        self.config.text_only = value;
        self
    }

    pub fn url_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.url_prefix = prefix.into();
        self
    }

    pub fn verbosity(mut self, value: Verbosity) -> Self {
        self.config.verbosity = value;
        self
    }

    /// Sets the HTTP timeout in seconds.
    pub fn timeout(mut self, secs: u64) -> Self {
        self.config.fetch.timeout = secs;
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config.fetch.user_agent = ua.into();
        self
    }

    pub fn proxy(mut self, proxy: Option<String>) -> Self {
        self.config.fetch.proxy = proxy;
        self
    }

    pub fn font_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.config.font_dir = dir;
        self
    }

    /// Overrides the asset directory. `None` disables logo and audio icon images.
    pub fn asset_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.config.asset_dir = dir;
        self
    }

    pub fn publication(mut self, publication: Publication) -> Self {
        self.config.publication = publication;
        self
    }

    /// Builds the config.
    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
