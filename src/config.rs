use crate::artifact::{validate_name, ArtifactRef, ArtifactSpec};
use crate::error::{CleaningError, Result};
use crate::process::clean::{CleanParams, DEFAULT_DATE_COLUMN, DEFAULT_PRICE_COLUMN};
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;

/// Download the raw dataset, apply basic cleaning and publish the result as a new artifact.
#[derive(Parser, Debug, Clone, Serialize)]
#[command(name = "basic_cleaning", about = "A very basic data cleaning")]
pub struct Args {
    /// Fully-qualified name for the input artifact
    #[arg(long = "input_artifact")]
    pub input_artifact: String,

    /// Name for the output artifact
    #[arg(long = "output_artifact")]
    pub output_artifact: String,

    /// Type for the output artifact
    #[arg(long = "output_type")]
    pub output_type: String,

    /// Description for the output artifact
    #[arg(long = "output_description")]
    pub output_description: String,

    /// Minimum price per night (inclusive)
    #[arg(long = "min_price", allow_negative_numbers = true)]
    pub min_price: f64,

    /// Maximum price per night (inclusive)
    #[arg(long = "max_price", allow_negative_numbers = true)]
    pub max_price: f64,

    /// Root directory of the local artifact store
    #[arg(long = "artifact_root", env = "ARTIFACT_ROOT", default_value = "artifacts")]
    pub artifact_root: PathBuf,

    /// Directory the temporary output file is created in
    #[arg(long = "work_dir", env = "CLEANING_WORK_DIR")]
    pub work_dir: Option<PathBuf>,

    /// Column holding the price to filter on
    #[arg(long = "price_column", default_value = DEFAULT_PRICE_COLUMN)]
    pub price_column: String,

    /// Column holding the last review date
    #[arg(long = "date_column", default_value = DEFAULT_DATE_COLUMN)]
    pub date_column: String,

    /// Job type recorded on the run
    #[arg(long = "job_type", default_value = "basic_cleaning")]
    pub job_type: String,
}

impl Args {
    /// Checks that need no I/O: non-empty strings, finite bounds, well-formed names.
    ///
    /// `min_price > max_price` is left to the pipeline, which reports it as an
    /// invalid range.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("input_artifact", &self.input_artifact),
            ("output_artifact", &self.output_artifact),
            ("output_type", &self.output_type),
            ("output_description", &self.output_description),
            ("price_column", &self.price_column),
            ("date_column", &self.date_column),
            ("job_type", &self.job_type),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(CleaningError::Configuration(format!(
                    "--{} must not be empty",
                    name
                )));
            }
        }
        for (name, value) in [("min_price", self.min_price), ("max_price", self.max_price)] {
            if !value.is_finite() {
                return Err(CleaningError::Configuration(format!(
                    "--{} must be a finite number, got {}",
                    name, value
                )));
            }
        }
        ArtifactRef::parse(&self.input_artifact)?;
        validate_name(&self.output_artifact)?;
        Ok(())
    }

    pub fn clean_params(&self) -> CleanParams {
        CleanParams {
            price_column: self.price_column.clone(),
            date_column: self.date_column.clone(),
            min_price: self.min_price,
            max_price: self.max_price,
        }
    }

    pub fn output_spec(&self) -> ArtifactSpec {
        ArtifactSpec {
            name: self.output_artifact.clone(),
            artifact_type: self.output_type.clone(),
            description: self.output_description.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &[&str] = &[
        "basic_cleaning",
        "--input_artifact",
        "sample.csv:latest",
        "--output_artifact",
        "clean_sample.csv",
        "--output_type",
        "clean_sample",
        "--output_description",
        "Data with outliers and null values removed",
        "--min_price",
        "10",
        "--max_price",
        "350",
    ];

    fn parse(extra: &[&str]) -> std::result::Result<Args, clap::Error> {
        Args::try_parse_from(BASE.iter().chain(extra.iter()))
    }

    #[test]
    fn parses_the_six_required_options() {
        let args = parse(&[]).unwrap();
        assert_eq!(args.input_artifact, "sample.csv:latest");
        assert_eq!(args.min_price, 10.0);
        assert_eq!(args.max_price, 350.0);
        assert_eq!(args.price_column, "price");
        assert_eq!(args.date_column, "last_review");
        assert!(args.validate().is_ok());

        let spec = args.output_spec();
        assert_eq!(spec.name, "clean_sample.csv");
        assert_eq!(spec.artifact_type, "clean_sample");
        assert_eq!(args.clean_params().max_price, 350.0);
    }

    #[test]
    fn missing_option_is_rejected_at_startup() {
        let without_max: Vec<&str> = BASE[..BASE.len() - 2].to_vec();
        assert!(Args::try_parse_from(without_max).is_err());
    }

    #[test]
    fn negative_bounds_parse() {
        let mut argv: Vec<&str> = BASE[..BASE.len() - 4].to_vec();
        argv.extend(["--min_price", "-5", "--max_price", "-1"]);
        let args = Args::try_parse_from(argv).unwrap();
        assert_eq!((args.min_price, args.max_price), (-5.0, -1.0));
    }

    #[test]
    fn validation_catches_bad_values() {
        let mut args = parse(&[]).unwrap();
        args.output_type = "  ".into();
        assert!(matches!(
            args.validate(),
            Err(CleaningError::Configuration(_))
        ));

        let mut args = parse(&[]).unwrap();
        args.max_price = f64::INFINITY;
        assert!(matches!(
            args.validate(),
            Err(CleaningError::Configuration(_))
        ));

        let mut args = parse(&[]).unwrap();
        args.input_artifact = "sample.csv:prod".into();
        assert!(matches!(
            args.validate(),
            Err(CleaningError::Configuration(_))
        ));
    }

    #[test]
    fn inverted_bounds_pass_config_validation() {
        let mut args = parse(&[]).unwrap();
        args.min_price = 500.0;
        assert!(args.validate().is_ok());
    }
}
