// CLI module for argument parsing and configuration

use crate::config::BrowserConfig;
use crate::domain::transfer::DeleteMode;
use crate::domain::{ListingOptions, SortBy};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use std::path::PathBuf;

/// Lotus - browse directories and copy, move, rename or delete files
#[derive(Parser, Debug, Clone)]
#[command(name = "lotus")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Print results as JSON
    #[arg(long = "json", global = true, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Increase log verbosity (-v for info, -vv for debug)
    #[arg(short = 'v', long = "verbose", global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List the contents of a directory
    Ls {
        /// Directory to list
        #[arg(default_value = ".")]
        directory: PathBuf,

        /// Show hidden entries (names starting with .)
        #[arg(long = "hidden", action = ArgAction::SetTrue)]
        show_hidden: bool,

        /// Sort entries by the given key
        #[arg(short = 's', long = "sort", value_enum, default_value = "name")]
        sort_by: SortOrder,

        /// Reverse sort order
        #[arg(short = 'r', long = "reverse", action = ArgAction::SetTrue)]
        reverse: bool,
    },

    /// Show details about a file or directory
    Info { path: PathBuf },

    /// Copy files or directories into a directory
    Cp {
        #[arg(required = true, num_args = 1..)]
        sources: Vec<PathBuf>,
        destination: PathBuf,
    },

    /// Move files or directories into a directory
    Mv {
        #[arg(required = true, num_args = 1..)]
        sources: Vec<PathBuf>,
        destination: PathBuf,
    },

    /// Move entries to the trash
    Rm {
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Delete permanently instead of moving to the trash
        #[arg(long = "permanent", action = ArgAction::SetTrue)]
        permanent: bool,
    },

    /// Rename an entry in place
    Rename { path: PathBuf, new_name: String },

    /// Open a file with its default application, or list a directory
    Open { path: PathBuf },

    /// List well-known places such as Documents and Downloads
    Places,
}

/// Sort order options
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum SortOrder {
    /// Sort by file name (alphabetical)
    #[default]
    Name,
    /// Sort by modification date (oldest first)
    Date,
    /// Sort by file size (smallest first)
    Size,
    /// Sort by extension
    Type,
}

impl From<SortOrder> for SortBy {
    fn from(order: SortOrder) -> Self {
        match order {
            SortOrder::Name => SortBy::Name,
            SortOrder::Date => SortBy::Date,
            SortOrder::Size => SortBy::Size,
            SortOrder::Type => SortBy::Type,
        }
    }
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Args::parse()
    }

    pub fn log_level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            _ => LevelFilter::Debug,
        }
    }

    /// Validate the arguments and return any errors
    pub fn validate(&self) -> Result<(), String> {
        match &self.command {
            Command::Ls { directory, .. } => {
                if !directory.exists() {
                    return Err(format!(
                        "Directory does not exist: {}",
                        directory.display()
                    ));
                }
                if !directory.is_dir() {
                    return Err(format!("Path is not a directory: {}", directory.display()));
                }
            }
            Command::Cp { destination, .. } | Command::Mv { destination, .. } => {
                if !destination.is_dir() {
                    return Err(format!(
                        "Destination is not a directory: {}",
                        destination.display()
                    ));
                }
            }
            _ => {}
        }
        Ok(())
    }
}

impl From<&Args> for BrowserConfig {
    fn from(args: &Args) -> Self {
        let mut config = BrowserConfig::default();
        match &args.command {
            Command::Ls {
                directory,
                show_hidden,
                sort_by,
                reverse,
            } => {
                config.start_dir = Some(directory.clone());
                config.listing = ListingOptions {
                    show_hidden: *show_hidden,
                    sort_by: (*sort_by).into(),
                    reverse: *reverse,
                    ..ListingOptions::default()
                };
            }
            Command::Rm { permanent, .. } => {
                if *permanent {
                    config.delete_mode = DeleteMode::Permanent;
                }
            }
            _ => {}
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    mod args_tests {
        use super::*;

        #[test]
        fn test_cli_definition_is_consistent() {
            Args::command().debug_assert();
        }

        #[test]
        fn test_parse_ls_defaults() {
            let args = Args::try_parse_from(["lotus", "ls"]).unwrap();
            assert_eq!(
                args.command,
                Command::Ls {
                    directory: PathBuf::from("."),
                    show_hidden: false,
                    sort_by: SortOrder::Name,
                    reverse: false,
                }
            );
            assert!(!args.json);
            assert_eq!(args.log_level(), LevelFilter::Warn);
        }

        #[test]
        fn test_parse_cp_multiple_sources() {
            let args = Args::try_parse_from(["lotus", "cp", "a.txt", "b.txt", "dest"]).unwrap();
            assert_eq!(
                args.command,
                Command::Cp {
                    sources: vec![PathBuf::from("a.txt"), PathBuf::from("b.txt")],
                    destination: PathBuf::from("dest"),
                }
            );
        }

        #[test]
        fn test_parse_cp_requires_destination() {
            assert!(Args::try_parse_from(["lotus", "cp", "a.txt"]).is_err());
        }

        #[test]
        fn test_global_flags_after_subcommand() {
            let args = Args::try_parse_from(["lotus", "places", "--json", "-vv"]).unwrap();
            assert!(args.json);
            assert_eq!(args.log_level(), LevelFilter::Debug);
        }

        #[test]
        fn test_validate_nonexistent_directory() {
            let args = Args::try_parse_from(["lotus", "ls", "/nonexistent/path/12345"]).unwrap();
            let result = args.validate();
            assert!(result.is_err());
            assert!(result.unwrap_err().contains("does not exist"));
        }

        #[test]
        fn test_validate_mv_destination_must_be_directory() {
            let args =
                Args::try_parse_from(["lotus", "mv", "a.txt", "/nonexistent/dest/12345"]).unwrap();
            let result = args.validate();
            assert!(result.unwrap_err().contains("not a directory"));
        }

        #[test]
        fn test_sort_order_conversion() {
            assert_eq!(SortBy::from(SortOrder::Name), SortBy::Name);
            assert_eq!(SortBy::from(SortOrder::Date), SortBy::Date);
            assert_eq!(SortBy::from(SortOrder::Size), SortBy::Size);
            assert_eq!(SortBy::from(SortOrder::Type), SortBy::Type);
        }
    }

    mod config_tests {
        use super::*;

        #[test]
        fn test_config_from_ls_args() {
            let args =
                Args::try_parse_from(["lotus", "ls", "/tmp", "--hidden", "-s", "size", "-r"])
                    .unwrap();
            let config = BrowserConfig::from(&args);

            assert_eq!(config.start_dir, Some(PathBuf::from("/tmp")));
            assert!(config.listing.show_hidden);
            assert_eq!(config.listing.sort_by, SortBy::Size);
            assert!(config.listing.reverse);
        }

        #[test]
        fn test_config_from_rm_args() {
            let args = Args::try_parse_from(["lotus", "rm", "x", "--permanent"]).unwrap();
            assert_eq!(BrowserConfig::from(&args).delete_mode, DeleteMode::Permanent);

            let args = Args::try_parse_from(["lotus", "rm", "x"]).unwrap();
            assert_eq!(BrowserConfig::from(&args).delete_mode, DeleteMode::Trash);
        }
    }
}
