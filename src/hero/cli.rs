use super::errors::CliError;
use super::settings::{CONFIG_PATH_DEFAULT, HeroSettings};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub struct CliOptions {
    pub config_path: PathBuf,
    pub model_path: Option<String>,
    pub particle_count: Option<usize>,
    pub start_unmounted: bool,
}

impl Default for CliOptions {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from(CONFIG_PATH_DEFAULT),
            model_path: None,
            particle_count: None,
            start_unmounted: false,
        }
    }
}

impl CliOptions {
    /// Command-line values win over whatever the config file said.
    pub fn apply(&self, settings: &mut HeroSettings) {
        if let Some(model) = &self.model_path {
            settings.model_path = model.clone();
        }
        if let Some(count) = self.particle_count {
            settings.particles.count = count;
            settings.particles.enabled = count > 0;
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CliCommand {
    Run(CliOptions),
    Help,
}

pub fn parse_args<I>(args: I) -> Result<CliCommand, CliError>
where
    I: IntoIterator<Item = String>,
{
    let mut options = CliOptions::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                let value = args.next().ok_or_else(|| CliError::MissingValue(arg.clone()))?;
                options.config_path = PathBuf::from(value);
            }
            "--model" | "-m" => {
                let value = args.next().ok_or_else(|| CliError::MissingValue(arg.clone()))?;
                options.model_path = Some(value);
            }
            "--particles" | "-p" => {
                let value = args.next().ok_or_else(|| CliError::MissingValue(arg.clone()))?;
                let count = value.parse::<usize>().map_err(|_| CliError::InvalidNumber {
                    flag: arg.clone(),
                    value,
                })?;
                options.particle_count = Some(count);
            }
            "--unmounted" => options.start_unmounted = true,
            "--help" | "-h" => return Ok(CliCommand::Help),
            _ => return Err(CliError::UnknownOption(arg)),
        }
    }

    Ok(CliCommand::Run(options))
}

pub fn parse_cli_options() -> CliOptions {
    match parse_args(env::args().skip(1)) {
        Ok(CliCommand::Run(options)) => options,
        Ok(CliCommand::Help) => print_cli_help_and_exit(0),
        Err(err) => {
            eprintln!("{err}");
            print_cli_help_and_exit(2);
        }
    }
}

pub fn print_cli_help_and_exit(code: i32) -> ! {
    println!(
        "Usage:\n  hero-scene [options]\n\nOptions:\n  -c, --config <path>     Scene settings file (default {CONFIG_PATH_DEFAULT})\n  -m, --model <path>      glTF model to show, relative to assets/\n  -p, --particles <n>     Particle count, 0 disables the field\n      --unmounted         Start without the scene; press M to mount\n  -h, --help              Show this help\n\nKeys:\n  M       Mount or unmount the scene\n  Escape  Quit"
    );
    std::process::exit(code);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn no_arguments_gives_defaults() {
        assert_eq!(
            parse_args(Vec::new()).unwrap(),
            CliCommand::Run(CliOptions::default())
        );
    }

    #[test]
    fn full_argument_set() {
        let parsed = parse_args(args(&[
            "--config",
            "alt.ron",
            "-m",
            "models/x.glb",
            "--particles",
            "42",
            "--unmounted",
        ]))
        .unwrap();

        assert_eq!(
            parsed,
            CliCommand::Run(CliOptions {
                config_path: PathBuf::from("alt.ron"),
                model_path: Some("models/x.glb".to_string()),
                particle_count: Some(42),
                start_unmounted: true,
            })
        );
    }

    #[rstest]
    #[case(&["--model"], CliError::MissingValue("--model".to_string()))]
    #[case(&["-p", "lots"], CliError::InvalidNumber { flag: "-p".to_string(), value: "lots".to_string() })]
    #[case(&["--fullscreen"], CliError::UnknownOption("--fullscreen".to_string()))]
    fn rejects_bad_arguments(#[case] input: &[&str], #[case] expected: CliError) {
        assert_eq!(parse_args(args(input)).unwrap_err(), expected);
    }

    #[test]
    fn help_short_circuits() {
        assert_eq!(
            parse_args(args(&["-h", "--bogus"])).unwrap(),
            CliCommand::Help
        );
    }

    #[test]
    fn zero_particles_disables_the_field() {
        let options = CliOptions {
            particle_count: Some(0),
            ..CliOptions::default()
        };
        let mut settings = HeroSettings::default();
        options.apply(&mut settings);
        assert!(!settings.particles.enabled);
        assert_eq!(settings.particles.count, 0);
    }
}
