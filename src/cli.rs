use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    name = "openparliament",
    about = "Scrape, store and republish House of Commons records"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a scheduled job, e.g. `job hansards`
    Job {
        /// Name of the job to run
        name: String,
    },
    /// Serve the JSON API
    Serve,
    /// Run the Hansard parser on one XML file
    Parse {
        file: PathBuf,
        /// Print only the speaker attributions
        #[arg(long)]
        print_names: bool,
    },
    #[command(subcommand)]
    Session(SessionCommand),
    /// Re-parse a document from its cached XML
    Reimport {
        document_id: u64,
        /// Record where the old statement sequence numbers went
        #[arg(long)]
        preserve_sequence: bool,
        /// Replace existing statements
        #[arg(long)]
        force: bool,
    },
    /// Download a debate's XML again and re-import it
    Refresh { document_id: u64 },
    #[command(subcommand)]
    Evidence(EvidenceCommand),
    #[command(subcommand)]
    Election(ElectionCommand),
}

#[derive(Subcommand, Debug)]
pub enum SessionCommand {
    /// Register a parliamentary session
    Add {
        parliament: u32,
        session: u32,
        start: NaiveDate,
        #[arg(long)]
        end: Option<NaiveDate>,
        #[arg(long)]
        name: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum EvidenceCommand {
    /// Register a committee meeting's evidence transcript
    Add {
        #[arg(long)]
        session: String,
        #[arg(long)]
        committee_slug: String,
        #[arg(long)]
        committee_name: String,
        #[arg(long)]
        source_id: u64,
        /// English XML
        #[arg(long)]
        en: PathBuf,
        /// French XML
        #[arg(long)]
        fr: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
pub enum ElectionCommand {
    /// Import Elections Canada results
    Import {
        date: NaiveDate,
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        allow_preliminary: bool,
    },
}
