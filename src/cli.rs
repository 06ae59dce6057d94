use std::cell::RefCell;
use std::fs::File;
use std::io::BufReader;
use std::rc::Rc;

use argparse::action::Action::Single;
use argparse::action::ParseResult;
use argparse::action::ParseResult::{Error, Parsed};
use argparse::action::TypedAction;
use argparse::action::{Action, IArgAction};

use crate::error::{Result, SimulationError};
use crate::experiment::FailurePolicy;
use crate::parameters::{parse_axis, ModelParameters, RunSettings};

/// Command line options besides the run settings.
#[derive(Debug, Clone)]
pub struct Options {
    pub model: String,
    /// A JSON file holding the model parameters, tagged with the model name.
    pub parameters: Option<String>,
    pub json: bool,
    pub keep_going: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            model: "unbiased_copy".to_string(),
            parameters: None,
            json: false,
            keep_going: false,
        }
    }
}

impl Options {
    /// The parameters from the JSON file if one was given, otherwise the
    /// reference parameters of the named model.
    pub fn model_parameters(&self) -> Result<ModelParameters> {
        match &self.parameters {
            None => ModelParameters::by_name(&self.model),
            Some(path) => {
                let parameters: ModelParameters =
                    serde_json::from_reader(BufReader::new(File::open(path)?))?;
                Ok(parameters)
            }
        }
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        if self.keep_going {
            FailurePolicy::Continue
        } else {
            FailurePolicy::FailFast
        }
    }
}

pub struct CollectAxisAction<'a> {
    pub cell: Rc<RefCell<&'a mut Vec<(String, Vec<f64>)>>>,
}

impl<'a> IArgAction for CollectAxisAction<'a> {
    fn parse_arg(&self, arg: &str) -> ParseResult {
        match parse_axis(arg) {
            Ok(axis) => {
                self.cell.borrow_mut().push(axis);
                Parsed
            }
            Err(SimulationError::Configuration(reason)) => Error(reason),
            Err(e) => Error(e.to_string()),
        }
    }
}

/// Collects every occurrence of an option of the form `name=v1,v2,...`.
pub struct CollectAxis;

impl TypedAction<Vec<(String, Vec<f64>)>> for CollectAxis {
    fn bind<'x>(&self, cell: Rc<RefCell<&'x mut Vec<(String, Vec<f64>)>>>) -> Action<'x> {
        Single(Box::new(CollectAxisAction { cell }))
    }
}

pub fn parse_args<'a>(
    settings: &'a mut RunSettings,
    options: &'a mut Options,
    description: &'a str,
) -> argparse::ArgumentParser<'a> {
    let mut parser = argparse::ArgumentParser::new();
    parser.set_description(description);
    parser.refer(&mut options.model).add_option(
        &["--model"],
        argparse::Store,
        "the transmission model to run, e.g. unbiased_copy, conformist_bias, critical_learner",
    );
    parser.refer(&mut options.parameters).add_option(
        &["--parameters"],
        argparse::StoreOption,
        "JSON parameter file, like {\"direct_bias\": {\"s_a\": 0.1}}; overrides --model",
    );
    parser.refer(&mut settings.population_size).add_option(
        &["--population-size", "-N"],
        argparse::Store,
        "number of agents",
    );
    parser.refer(&mut settings.max_t).add_option(
        &["--generations"],
        argparse::Store,
        "number of generations per run, including the initial one",
    );
    parser.refer(&mut settings.replicates).add_option(
        &["--runs"],
        argparse::Store,
        "number of independent runs per parameter combination",
    );
    parser.refer(&mut settings.seed).add_option(
        &["--seed"],
        argparse::Store,
        "seed of the experiment",
    );
    parser.refer(&mut settings.workers).add_option(
        &["--workers"],
        argparse::Store,
        "size of the worker pool (0: one per core)",
    );
    parser.refer(&mut options.keep_going).add_option(
        &["--keep-going"],
        argparse::StoreTrue,
        "report failing runs and keep the others, instead of stopping at the first failure",
    );
    parser.refer(&mut options.json).add_option(
        &["--json"],
        argparse::StoreTrue,
        "print JSON instead of a comma-separated table",
    );
    parser
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_are_parsed() {
        let mut settings = RunSettings::default();
        let mut options = Options::default();
        let mut axes: Vec<(String, Vec<f64>)> = vec![];
        {
            let mut parser = parse_args(&mut settings, &mut options, "test");
            parser.refer(&mut axes).add_option(&["--axis"], CollectAxis, "axis");
            let args: Vec<String> = [
                "sweep",
                "--model",
                "conformist_bias",
                "--generations",
                "50",
                "--axis",
                "d=0,1",
                "--axis",
                "p_0=0.55",
                "--json",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect();
            parser
                .parse(args, &mut std::io::sink(), &mut std::io::sink())
                .unwrap();
        }
        assert_eq!(settings.max_t, 50);
        assert_eq!(options.model, "conformist_bias");
        assert!(options.json);
        assert_eq!(
            axes,
            vec![
                ("d".to_string(), vec![0.0, 1.0]),
                ("p_0".to_string(), vec![0.55])
            ]
        );
        assert_eq!(
            options.model_parameters().unwrap().name(),
            "conformist_bias"
        );
    }
}
