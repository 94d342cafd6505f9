use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "studybuddy",
    version,
    about = "Telegram study assistant: PDF notes, grounded Q&A, quizzes"
)]
pub struct Args {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the Telegram bot (the default)
    Run,

    /// Index a PDF for a user without going through Telegram
    Index {
        /// Path to the PDF file
        file: PathBuf,

        /// User id to index the document under
        #[arg(long, default_value_t = 0)]
        user: i64,
    },

    /// Ask one grounded question from the command line
    Ask {
        /// The question text
        question: String,

        /// User id whose document to query
        #[arg(long, default_value_t = 0)]
        user: i64,
    },

    /// Show the config file location and which secrets are missing
    Config,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_args_defaults_to_run() {
        let args = Args::parse_from(["studybuddy"]);
        assert!(args.command.is_none());
        assert_eq!(args.verbose, 0);
    }

    #[test]
    fn test_index_subcommand() {
        let args = Args::parse_from(["studybuddy", "index", "notes.pdf", "--user", "7"]);
        match args.command {
            Some(Command::Index { file, user }) => {
                assert_eq!(file, PathBuf::from("notes.pdf"));
                assert_eq!(user, 7);
            }
            _ => panic!("expected index subcommand"),
        }
    }

    #[test]
    fn test_ask_subcommand() {
        let args = Args::parse_from(["studybuddy", "-vv", "ask", "что такое сила?"]);
        assert_eq!(args.verbose, 2);
        match args.command {
            Some(Command::Ask { question, user }) => {
                assert_eq!(question, "что такое сила?");
                assert_eq!(user, 0);
            }
            _ => panic!("expected ask subcommand"),
        }
    }
}
