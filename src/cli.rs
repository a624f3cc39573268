use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::ClientConfig;
use crate::editor::Grammar;
use crate::error::Result;

#[derive(Parser, Debug)]
#[command(name = "livecode-session")]
#[command(version)]
#[command(about = "Headless client for live-coding challenge sessions")]
pub struct Args {
    /// TOML config file (defaults apply when omitted)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the API base URL, e.g. http://host/api/live-coding
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Print a challenge, its teams and your join state
    Show {
        /// Challenge access code
        code: String,
    },

    /// Join a team and remember the participant cookie
    Join {
        code: String,

        /// Team id to join
        #[arg(long)]
        team: String,
    },

    /// Run a session: sync two local files as the HTML and CSS buffers
    Watch {
        code: String,

        #[arg(long)]
        html: PathBuf,

        #[arg(long)]
        css: PathBuf,

        /// How often to check the files for changes, in milliseconds
        #[arg(long, default_value = "500")]
        poll_ms: u64,
    },

    /// Show the autocomplete suggestions for a snippet
    Complete {
        /// html or css
        #[arg(long, default_value = "html")]
        grammar: Grammar,

        text: String,

        /// Caret byte offset (defaults to the end of the text)
        #[arg(long)]
        cursor: Option<usize>,
    },
}

impl Args {
    /// Load the config file (if any), then apply the `--base-url` override.
    pub fn client_config(&self) -> Result<ClientConfig> {
        let mut config = ClientConfig::load(self.config.as_deref())?;
        if let Some(url) = &self.base_url {
            config.base_url = url.clone();
            config.validate()?;
        }
        Ok(config)
    }
}
