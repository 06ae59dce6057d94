use model::cli::{parse_args, Options};
use model::experiment::Experiment;
use model::parameters::RunSettings;

fn main() -> Result<(), String> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let mut settings = RunSettings::default();
    let mut options = Options::default();
    {
        let parser = parse_args(
            &mut settings,
            &mut options,
            "Run independent replicates of one cultural transmission model",
        );
        parser.parse_args_or_exit();
    }

    let parameters = options.model_parameters().map_err(|e| e.to_string())?;
    let result = Experiment::replicates(parameters, settings)
        .with_failure_policy(options.failure_policy())
        .run()
        .map_err(|e| e.to_string())?;
    result
        .write(options.json, std::io::stdout().lock())
        .map_err(|e| e.to_string())
}
