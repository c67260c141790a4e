//! brick CLI: solve a cantilever elasticity problem and write a VTK file.

use brick_core::{run, ProblemConfig, SolverType};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "brick")]
#[command(version, about = "Linear elasticity on structured hexahedral grids")]
struct Cli {
    /// Problem configuration (TOML). The reference cantilever is used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output file (.vtk or .vtu), overriding the configuration.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Displacement exaggeration for the exported mesh.
    #[arg(short, long)]
    scale: Option<f64>,

    /// Linear solver (direct, iterative, auto).
    #[arg(long)]
    solver: Option<SolverType>,

    /// Print the effective configuration as TOML and exit.
    #[arg(long)]
    print_config: bool,

    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> brick_core::Result<ProblemConfig> {
    let mut config = match &cli.config {
        Some(path) => ProblemConfig::from_file(path)?,
        None => ProblemConfig::default(),
    };
    if let Some(output) = &cli.output {
        config.output.path = output.clone();
    }
    if let Some(scale) = cli.scale {
        config.output.displacement_scale = scale;
    }
    if let Some(solver) = cli.solver {
        config.solver.solver_type = solver;
    }
    config.validate()?;
    info!(
        source = %cli.config.as_ref().map_or("defaults".into(), |p| p.display().to_string()),
        output = %config.output.path.display(),
        "loaded configuration"
    );
    Ok(config)
}

fn execute(cli: &Cli) -> brick_core::Result<()> {
    let config = load_config(cli)?;
    if cli.print_config {
        print!("{}", config.to_toml_string()?);
        return Ok(());
    }

    let solution = run(&config)?;
    solution.export(&config.output.path, config.output.displacement_scale)?;

    let units = &config.units;
    let (node, umax) = solution.max_displacement();
    println!("Nodes:             {}", solution.mesh.n_nodes());
    println!("Elements:          {}", solution.mesh.n_elements());
    println!("Solver:            {} ({:.3} s)", solution.stats.solver, solution.stats.time_seconds);
    println!(
        "Load resultant:    ({:.4e}, {:.4e}, {:.4e}) {}",
        solution.load_resultant[0], solution.load_resultant[1], solution.load_resultant[2], units.force
    );
    println!("Max displacement:  {:.6e} {} at node {}", umax, units.length, node);
    if let Some((min, max)) = solution.mesh.bounds() {
        if let Some(tip) = solution.tip_deflection(max[0]) {
            println!("Tip deflection:    {:.6e} {} at x = {} (root x = {})", tip, units.length, max[0], min[0]);
        }
    }
    println!("Wrote:             {}", config.output.path.display());
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match execute(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("brick-cli-{}-{}", std::process::id(), name))
    }

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("brick").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults_without_config() {
        let config = load_config(&parse(&[])).unwrap();
        assert_eq!(config, ProblemConfig::default());
    }

    #[test]
    fn test_flags_override_config_file() {
        let mut file_config = ProblemConfig::default();
        file_config.output.path = PathBuf::from("from_file.vtk");
        file_config.output.displacement_scale = 10.0;
        file_config.solver.solver_type = SolverType::Direct;
        let path = temp_path("override.toml");
        fs::write(&path, file_config.to_toml_string().unwrap()).unwrap();

        let config_arg = path.to_string_lossy().into_owned();
        let kept = load_config(&parse(&["--config", config_arg.as_str()])).unwrap();
        assert_eq!(kept, file_config);

        let cli = parse(&[
            "--config", config_arg.as_str(), "--output", "flag.vtu", "--scale", "2.5", "--solver", "iterative",
        ]);
        let config = load_config(&cli).unwrap();
        assert_eq!(config.output.path, PathBuf::from("flag.vtu"));
        assert_eq!(config.output.displacement_scale, 2.5);
        assert_eq!(config.solver.solver_type, SolverType::Iterative);
        assert_eq!(config.mesh, file_config.mesh);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_unknown_solver_rejected_by_parser() {
        let args = ["brick", "--solver", "multigrid"];
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn test_non_finite_scale_rejected() {
        let result = load_config(&parse(&["--scale", "inf"]));
        assert!(matches!(result, Err(brick_core::Error::Config(_))));
    }

    #[test]
    fn test_print_config_writes_nothing() {
        let output = temp_path("print.vtk");
        let output_arg = output.to_string_lossy().into_owned();
        execute(&parse(&["--print-config", "--output", output_arg.as_str()])).unwrap();
        assert!(!output.exists());
    }

    #[test]
    fn test_failed_run_writes_no_output() {
        let mut bad = ProblemConfig::default();
        bad.load.selector = brick_core::Selector::plane(brick_core::Axis::X, 6.0);
        let output = temp_path("failed.vtk");
        bad.output.path = output.clone();
        let path = temp_path("failed.toml");
        fs::write(&path, bad.to_toml_string().unwrap()).unwrap();

        let config_arg = path.to_string_lossy().into_owned();
        let result = execute(&parse(&["--config", config_arg.as_str()]));
        assert!(matches!(result, Err(brick_core::Error::EmptySelection(_))));
        assert!(!output.exists());
        fs::remove_file(&path).unwrap();
    }
}
