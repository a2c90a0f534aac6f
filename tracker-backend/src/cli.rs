//! Cli things
//!

use std::path::PathBuf;

use clap::Parser;

use crate::auth::DEFAULT_USER_HEADER;

pub fn db_path_default() -> String {
    shellexpand::tilde("~/.cache/issue-tracker.sqlite3").to_string()
}

#[derive(Parser, Debug)]
pub struct CliOpts {
    #[clap(long, help = "Path to the database file", env = "TRACKER_DB_PATH")]
    pub db_path: Option<PathBuf>,

    #[clap(long, help = "Enable debug logging")]
    pub debug: bool,

    #[clap(
        long,
        help = "Request header the authenticating proxy puts the user identity in",
        env = "TRACKER_USER_HEADER",
        default_value = DEFAULT_USER_HEADER
    )]
    pub user_header: String,
}

impl CliOpts {
    /// Database path with `~` expanded.
    pub fn db_path(&self) -> PathBuf {
        match &self.db_path {
            Some(path) => PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).to_string()),
            None => PathBuf::from(db_path_default()),
        }
    }
}
