use std::collections::BTreeSet;
use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use log::{info, warn};
use pacewise::{
    AnalyzerConfig, DeviationRule, FilterParameters, GroupingMode, PaceError, Session,
    SessionWindow, analyze, config::DEFAULT_PERCENTAGE, load_session, writer,
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the classes of a timing export with their cars and session time
    Classes {
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Compute representative pace for one class
    Analyze(AnalyzeArgs),
    /// Write the default configuration file
    InitConfig,
}

#[derive(ClapArgs, Debug)]
struct AnalyzeArgs {
    /// Semicolon separated timing export
    #[arg(short, long)]
    input: PathBuf,

    /// Class to analyze
    #[arg(short, long)]
    class: String,

    /// Car numbers to include (comma separated), all cars of the class by default
    #[arg(long, value_delimiter = ',')]
    cars: Vec<String>,

    /// Share of the fastest laps to average, in (0, 1]
    #[arg(short, long)]
    top: Option<f64>,

    /// Ignore laps ending before this session hour
    #[arg(long)]
    from_hour: Option<f64>,

    /// Ignore laps ending after this session hour
    #[arg(long)]
    to_hour: Option<f64>,

    /// Maximum seconds off the best lap, 0 disables the limit
    #[arg(long, conflicts_with_all = ["manufacturer_pct", "driver_pct"])]
    max_delta: Option<f64>,

    /// Percentage of the class best allowed for car and manufacturer averages
    #[arg(long)]
    manufacturer_pct: Option<f64>,

    /// Percentage of their own best allowed for driver averages
    #[arg(long)]
    driver_pct: Option<f64>,

    /// How to group laps
    #[arg(long, value_enum)]
    by: Option<GroupOpt>,

    /// Pit crossing flag value marking pit laps
    #[arg(long)]
    pit_marker: Option<String>,

    /// Also write result rows to this file as JSON lines
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum GroupOpt {
    Car,
    Manufacturer,
    Driver,
}

impl From<GroupOpt> for GroupingMode {
    fn from(value: GroupOpt) -> Self {
        match value {
            GroupOpt::Car => GroupingMode::ByCar,
            GroupOpt::Manufacturer => GroupingMode::ByManufacturer,
            GroupOpt::Driver => GroupingMode::ByDriver,
        }
    }
}

fn load_config() -> AnalyzerConfig {
    AnalyzerConfig::from_local_file()
        .unwrap_or_else(|e| {
            warn!("Ignoring config file: {}", e);
            None
        })
        .unwrap_or_default()
}

fn classes(input: &PathBuf) -> Result<(), PaceError> {
    let session = load_session(input)?;
    for class in session.classes() {
        let cars = session.cars_in_class(&class);
        let time = session
            .elapsed_range(&cars)
            .map(|(from, to)| format!("{:.2}h - {:.2}h", from, to))
            .unwrap_or_else(|| "no elapsed time".to_string());
        println!("{}: {} cars [{}], {}", class, cars.len(), cars.join(", "), time);
    }
    Ok(())
}

fn parameters(
    session: &Session,
    args: &AnalyzeArgs,
    config: &AnalyzerConfig,
) -> Result<FilterParameters, PaceError> {
    let mut params = FilterParameters::for_class(session, &args.class, config)?;

    if !args.cars.is_empty() {
        let known = session.cars_in_class(&params.target_class);
        params.selected_cars = selected_cars(&args.cars);
        for car in params.selected_cars.iter().filter(|car| !known.contains(car)) {
            warn!("Car {} does not race in {}", car, params.target_class);
        }
        params.session_window = session
            .elapsed_range(&params.selected_cars)
            .map(|(from, to)| SessionWindow::new(from, to));
    }

    if args.from_hour.is_some() || args.to_hour.is_some() {
        let observed = params.session_window;
        params.session_window = Some(SessionWindow::new(
            args.from_hour
                .or(observed.map(|w| w.min_hours))
                .unwrap_or(0.0),
            args.to_hour
                .or(observed.map(|w| w.max_hours))
                .unwrap_or(f64::INFINITY),
        ));
    }

    if let Some(fraction) = args.top {
        params.target_fraction = fraction;
    }

    if let Some(max_delta_seconds) = args.max_delta {
        params.deviation = DeviationRule::AbsoluteDelta { max_delta_seconds };
    } else if args.manufacturer_pct.is_some() || args.driver_pct.is_some() {
        let (configured_manufacturer, configured_driver) = match config.deviation {
            DeviationRule::Percentage {
                manufacturer_pct,
                driver_pct,
            } => (manufacturer_pct, driver_pct),
            DeviationRule::AbsoluteDelta { .. } => (DEFAULT_PERCENTAGE, DEFAULT_PERCENTAGE),
        };
        params.deviation = DeviationRule::Percentage {
            manufacturer_pct: args.manufacturer_pct.unwrap_or(configured_manufacturer),
            driver_pct: args.driver_pct.unwrap_or(configured_driver),
        };
    }

    if let Some(by) = args.by {
        params.grouping_mode = by.into();
    }
    if let Some(marker) = &args.pit_marker {
        params.pit_marker = marker.clone();
    }
    Ok(params)
}

/// Car numbers given with `--cars`, trimmed, blanks dropped.
fn selected_cars(cars: &[String]) -> BTreeSet<String> {
    cars.iter()
        .map(|car| car.trim())
        .filter(|car| !car.is_empty())
        .map(str::to_string)
        .collect()
}

fn run_analysis(args: &AnalyzeArgs) -> Result<(), PaceError> {
    let config = load_config();
    let session = load_session(&args.input)?;
    let params = parameters(&session, args, &config)?;
    info!("Analyzing with {:?}", params);

    let rows = analyze(&session, &params)?;
    println!("{}", writer::render_table(&rows));

    if let Some(output) = &args.output {
        writer::write_results(output, &rows)?;
        info!("Wrote {} rows to {:?}", rows.len(), output);
    }
    Ok(())
}

fn init_config() -> Result<(), PaceError> {
    let path = AnalyzerConfig::default().save()?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}

fn main() {
    #[cfg(debug_assertions)]
    colog::init();

    let cli = Args::parse();
    let result = match &cli.command {
        Commands::Classes { input } => classes(input),
        Commands::Analyze(args) => run_analysis(args),
        Commands::InitConfig => init_config(),
    };
    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
