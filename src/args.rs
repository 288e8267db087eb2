use std::path::PathBuf;

use clap::Parser;

#[derive(Clone, Debug, Parser)]
pub struct TaskmasterArgs {
    /// SQLite database URL
    #[clap(short, long, env = "TASKMASTER_DATABASE")]
    pub database: String,

    /// Path to the uploaded-submissions directory
    #[clap(short, long, env = "TASKMASTER_UPLOADS")]
    pub uploads: PathBuf,

    /// Port
    #[clap(long, env = "TASKMASTER_PORT")]
    pub port: u16,
}
