use clap::Subcommand;
use std::path::PathBuf;

/// Keyword subcommands
#[derive(Subcommand, Debug)]
pub enum KeywordsCommands {
    /// Cluster keywords and write the category reports
    Analyze {
        /// Read documents from a JSON file instead of the library
        #[arg(long)]
        input: Option<PathBuf>,

        /// Directory the reports are written to
        #[arg(long, default_value = "keyword_analysis")]
        output_dir: PathBuf,
    },

    /// Print the most frequent keywords after merging
    Top {
        /// Read documents from a JSON file instead of the library
        #[arg(long)]
        input: Option<PathBuf>,

        /// Number of keywords to show (default from config)
        #[arg(short = 'n', long = "limit")]
        limit: Option<usize>,
    },
}
