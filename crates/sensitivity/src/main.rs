#[cfg(feature = "native")]
use clap::{Parser, Subcommand};
#[cfg(feature = "native")]
use sensitivity::viewer::{Viewer, ViewerState};
#[cfg(feature = "native")]
use sensitivity::{SweepFile, init_logging, write_report};
#[cfg(feature = "native")]
use sensitivity_core::NumberFormat;
#[cfg(feature = "native")]
use std::path::PathBuf;

#[cfg(feature = "native")]
#[derive(Parser, Debug)]
#[command(name = "sensitivity")]
#[command(about = "Sweep a model over parameter combinations and visualize the results")]
struct Args {
    /// Path to the data directory holding the log file (default: ~/.sensitivity/)
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// Log level (debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[cfg(feature = "native")]
#[derive(Subcommand, Debug)]
enum Command {
    /// Run a sweep and write tables and plots to a directory
    Run {
        sweep: PathBuf,
        /// Output directory
        #[arg(short, long, default_value = "sensitivity-output")]
        output: PathBuf,
    },
    /// Run a sweep and print the styled tables
    Table {
        sweep: PathBuf,
        /// Number format overriding the sweep file's, e.g. "${:,.0f}"
        #[arg(long)]
        num_fmt: Option<NumberFormat>,
    },
    /// Run a sweep and browse the styled tables in the terminal
    View { sweep: PathBuf },
}

#[cfg(feature = "native")]
fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".sensitivity")
}

#[cfg(feature = "native")]
fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    let data_dir = args.data_dir.unwrap_or_else(default_data_dir);

    init_logging(&data_dir, &args.log_level)?;

    match args.command {
        Command::Run { sweep, output } => {
            let analyzer = SweepFile::load(&sweep)?.run(None)?;
            for path in write_report(&analyzer, &output)? {
                println!("{}", path.display());
            }
        }
        Command::Table { sweep, num_fmt } => {
            let sweep = SweepFile::load(&sweep)?;
            let analyzer = sweep.run(None)?;
            let num_fmt = num_fmt.as_ref().or(sweep.num_fmt.as_ref());
            print!("{}", analyzer.styled_tables_with(num_fmt)?.to_plain());
        }
        Command::View { sweep } => {
            let analyzer = SweepFile::load(&sweep)?.run(None)?;
            let mut viewer = Viewer::new(ViewerState::from_analyzer(&analyzer)?);

            ratatui::run(|terminal| viewer.run(terminal))?;

            if let Err(err) = ratatui::try_restore() {
                tracing::error!("Failed to restore terminal: {err}");
            }
        }
    }

    tracing::info!("sensitivity shutting down");
    Ok(())
}

#[cfg(not(feature = "native"))]
fn main() {
    panic!("This binary requires the 'native' feature.");
}
