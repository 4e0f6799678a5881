use clap::{Parser, Subcommand};
use estimator_common::{Capability, Category, Outcome, Role};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "estimator")]
#[command(about = "Awning and canopy job cost estimator", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Debug logging to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Acting role (admin/manager/estimator/viewer); defaults to the settings role
    #[arg(long, env = "ESTIMATOR_ROLE", global = true)]
    pub role: Option<Role>,

    /// Cost sheet store file (default: data directory)
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a cost sheet from a draft JSON file
    Create {
        /// Draft JSON (category, customer, dimensions, lines, rates, site ...)
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Import a legacy Excel cost workbook, or every workbook in a folder
    Import {
        /// .xlsx/.xls file or folder
        #[arg(required = true)]
        path: PathBuf,

        /// Import even if the same file was imported before
        #[arg(long)]
        force: bool,
    },

    /// Show one cost sheet
    Show {
        id: u64,

        /// Print the stored JSON
        #[arg(long)]
        json: bool,
    },

    /// List cost sheets
    List {
        #[arg(short, long)]
        category: Option<Category>,

        /// Only trashed sheets
        #[arg(long, conflicts_with = "all")]
        trashed: bool,

        /// Active and trashed sheets
        #[arg(long)]
        all: bool,
    },

    /// Replace the line items of a draft sheet
    Edit {
        id: u64,

        /// JSON with materials / fabric / labor / recap arrays
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Tag a sheet as won, lost or unknown
    Outcome {
        id: u64,

        /// won/lost/unknown
        outcome: Outcome,
    },

    /// Mark a sheet FINAL (or back to DRAFT)
    Finalize {
        id: u64,

        #[arg(long)]
        reopen: bool,
    },

    /// Move a sheet to the trash
    Trash { id: u64 },

    /// Bring a sheet back from the trash
    Restore { id: u64 },

    /// Permanently delete a sheet
    Delete {
        id: u64,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Weighted price-per-foot benchmarks by category
    Stats {
        #[arg(short, long)]
        category: Option<Category>,

        /// Check a pre-delivery $/sq ft quote against the category benchmark
        #[arg(long, requires = "category")]
        check: Option<f64>,
    },

    /// Export one sheet (or the whole history) to Excel
    Export {
        /// Sheet id; omit for the history workbook
        id: Option<u64>,

        /// Output file or directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Driving distance and time to a job site
    Distance {
        /// Job site address
        #[arg(long)]
        to: String,

        /// Origin address (default: settings shopAddress)
        #[arg(long)]
        from: Option<String>,

        /// Write mileage and drive time into this draft sheet
        #[arg(long)]
        sheet: Option<u64>,

        /// Round trips to the site
        #[arg(long, default_value = "1", requires = "sheet")]
        trips: f64,
    },

    /// Look up a customer company in HubSpot
    Customer {
        #[arg(required = true)]
        query: String,
    },

    /// Show or edit settings
    Config {
        /// Set a value (repeatable), e.g. --set markup=0.75
        #[arg(long, value_name = "KEY=VALUE")]
        set: Vec<String>,

        /// Show settings
        #[arg(long)]
        show: bool,
    },
}

impl Commands {
    /// Capabilities checked before the command runs
    pub fn required_capabilities(&self) -> Vec<Capability> {
        match self {
            Commands::Create { .. } => vec![Capability::CreateSheets],
            Commands::Import { .. } => vec![Capability::ImportExcel],
            Commands::Show { .. } | Commands::List { .. } => vec![Capability::ViewSheets],
            Commands::Edit { .. } => vec![Capability::EditSheets],
            Commands::Outcome { .. } => vec![Capability::TagOutcome],
            Commands::Finalize { .. } => vec![Capability::FinalizeSheets],
            Commands::Trash { .. } => vec![Capability::TrashSheets],
            Commands::Restore { .. } => vec![Capability::RestoreSheets],
            Commands::Delete { .. } => vec![Capability::HardDeleteSheets],
            Commands::Stats { .. } => vec![Capability::ViewAnalytics],
            Commands::Export { .. } => vec![Capability::ExportExcel],
            Commands::Distance { sheet: Some(_), .. } => {
                vec![Capability::UseIntegrations, Capability::EditSheets]
            }
            Commands::Distance { .. } | Commands::Customer { .. } => vec![Capability::UseIntegrations],
            Commands::Config { set, .. } if !set.is_empty() => vec![Capability::ManageSettings],
            Commands::Config { .. } => vec![Capability::ViewSheets],
        }
    }
}

/// Split `key=value`
pub fn parse_setting(arg: &str) -> Result<(&str, &str), String> {
    arg.split_once('=')
        .map(|(k, v)| (k.trim(), v.trim()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", arg))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("estimator").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_parse_list_flags() {
        let cli = parse(&["list", "--category", "shade sail", "--trashed"]);
        match cli.command {
            Commands::List { category, trashed, all } => {
                assert_eq!(category, Some(Category::ShadeSail));
                assert!(trashed);
                assert!(!all);
            }
            _ => panic!("expected list"),
        }
    }

    #[test]
    fn test_trashed_conflicts_with_all() {
        assert!(Cli::try_parse_from(["estimator", "list", "--trashed", "--all"]).is_err());
    }

    #[test]
    fn test_global_role_flag() {
        let cli = parse(&["show", "3", "--role", "viewer"]);
        assert_eq!(cli.role, Some(Role::Viewer));
        assert!(Cli::try_parse_from(["estimator", "show", "3", "--role", "owner"]).is_err());
    }

    #[test]
    fn test_check_requires_category() {
        assert!(Cli::try_parse_from(["estimator", "stats", "--check", "9.5"]).is_err());
        let cli = parse(&["stats", "--category", "awning", "--check", "9.5"]);
        assert!(matches!(cli.command, Commands::Stats { check: Some(_), .. }));
    }

    #[test]
    fn test_required_capabilities() {
        let cmd = parse(&["config", "--show"]).command;
        assert_eq!(cmd.required_capabilities(), vec![Capability::ViewSheets]);

        let cmd = parse(&["config", "--set", "markup=0.7"]).command;
        assert_eq!(cmd.required_capabilities(), vec![Capability::ManageSettings]);

        let cmd = parse(&["distance", "--to", "12 Harbor Rd"]).command;
        assert_eq!(cmd.required_capabilities(), vec![Capability::UseIntegrations]);

        let cmd = parse(&["distance", "--to", "12 Harbor Rd", "--sheet", "4", "--trips", "2"]).command;
        assert!(cmd.required_capabilities().contains(&Capability::EditSheets));

        let cmd = parse(&["delete", "4", "--yes"]).command;
        assert_eq!(cmd.required_capabilities(), vec![Capability::HardDeleteSheets]);
    }

    #[test]
    fn test_parse_setting() {
        assert_eq!(parse_setting("markup=0.75"), Ok(("markup", "0.75")));
        assert_eq!(parse_setting("googleMapsApiKey="), Ok(("googleMapsApiKey", "")));
        assert!(parse_setting("markup").is_err());
        assert!(parse_setting("=1").is_err());
    }

    #[test]
    fn test_outcome_argument() {
        let cli = parse(&["outcome", "7", "won"]);
        assert!(matches!(cli.command, Commands::Outcome { id: 7, outcome: Outcome::Won }));
    }
}
