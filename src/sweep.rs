use model::cli::{parse_args, CollectAxis, Options};
use model::experiment::Experiment;
use model::parameters::{ParameterGrid, RunSettings};

fn main() -> Result<(), String> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let mut settings = RunSettings::default();
    let mut options = Options::default();
    let mut axes: Vec<(String, Vec<f64>)> = vec![];
    {
        let mut parser = parse_args(
            &mut settings,
            &mut options,
            "Run a cultural transmission model over a grid of parameter values",
        );
        parser.refer(&mut axes).add_option(
            &["--axis"],
            CollectAxis,
            "a grid axis as name=v1,v2,... (repeat for more axes; the last one varies fastest)",
        );
        parser.parse_args_or_exit();
    }

    let parameters = options.model_parameters().map_err(|e| e.to_string())?;
    let mut grid = ParameterGrid::default();
    for (name, values) in axes {
        grid.push(&name, values).map_err(|e| e.to_string())?;
    }
    let result = Experiment::sweep(parameters, settings, grid)
        .with_failure_policy(options.failure_policy())
        .run()
        .map_err(|e| e.to_string())?;
    result
        .write(options.json, std::io::stdout().lock())
        .map_err(|e| e.to_string())
}
