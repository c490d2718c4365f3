use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(
    name = "gitnotes",
    bin_name = "gitnotes",
    version,
    disable_help_subcommand = true
)]
#[command(about = "Plain text notes kept in sync with git repositories", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Data directory (defaults to $GITNOTES_HOME, then the OS data directory)
    #[arg(long, global = true, help_heading = "Options")]
    pub data: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, global = true, default_value_t = OutputFormat::Text, help_heading = "Options")]
    pub output: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true, help_heading = "Options")]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Add, list, show, edit and delete notes
    #[command(subcommand, alias = "n", display_order = 1)]
    Note(NoteCommands),

    /// Manage local git working trees
    #[command(subcommand, display_order = 2)]
    Repo(RepoCommands),

    /// Write notes into a repository, commit and push to its remote
    #[command(display_order = 3)]
    Push {
        /// Repository name or path
        repository: String,

        /// Overwrite the remote branch even if that loses history
        #[arg(long)]
        force: bool,
    },

    /// Fetch a repository's remote and merge its note files into the store
    #[command(display_order = 4)]
    Pull {
        /// Repository name or path
        repository: String,

        /// Remote URL to pull from (defaults to the repository's link)
        #[arg(long)]
        remote: Option<String>,
    },

    /// Clone a remote into a new repository and import its notes
    #[command(display_order = 5)]
    Clone { url: String },

    /// Store the access token (and optional username) used for remotes
    #[command(display_order = 6)]
    Login {
        #[arg(long)]
        token: String,

        #[arg(long)]
        username: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum NoteCommands {
    /// Create a note
    #[command(alias = "new")]
    Add {
        /// Title words (joined with spaces)
        #[arg(required = true, num_args = 1..)]
        title: Vec<String>,

        /// Note body (read from stdin when piped and not given)
        #[arg(long, short)]
        body: Option<String>,
    },

    /// List notes
    #[command(alias = "ls")]
    List,

    /// Show one or more notes
    #[command(alias = "view")]
    Show {
        /// Note ids (e.g. 1 3 2-4)
        #[arg(required = true, num_args = 1..)]
        ids: Vec<String>,
    },

    /// Change a note's title and/or body
    Edit {
        id: String,

        #[arg(long, short)]
        title: Option<String>,

        #[arg(long, short)]
        body: Option<String>,
    },

    /// Delete notes
    #[command(alias = "delete")]
    Rm {
        #[arg(required = true, num_args = 1..)]
        ids: Vec<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum RepoCommands {
    /// Initialize a repository and write the current notes into it
    Create {
        name: String,

        /// Remote URL to record as the repository's link
        #[arg(long)]
        remote: Option<String>,
    },

    /// List repositories and their remote links
    #[command(alias = "ls")]
    List,

    /// Delete a repository's working tree
    #[command(alias = "delete")]
    Rm { name: String },
}
