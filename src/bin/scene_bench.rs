use anyhow::{Context, Result, bail, ensure};
use bevy::math::{Vec2, Vec3};
use hero_scene::hero::lighting::{LightSpec, ambient_spec, light_table};
use hero_scene::hero::particles::ParticleField;
use hero_scene::hero::settings::valid_half_extent;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

const FRAME_SECONDS: f32 = 1.0 / 60.0;
const PARTICLE_SPEED: f32 = 0.02;
const CSV_HEADER: &str =
    "name,particles,steps,ns_per_step_min,ns_per_step_median,ns_per_step_max,checksum";

#[derive(Debug, Deserialize)]
struct Scenario {
    name: String,
    particles: usize,
    steps: usize,
    #[serde(default = "default_half_extents")]
    half_extents: (f32, f32, f32),
}

fn default_half_extents() -> (f32, f32, f32) {
    (20.0, 12.0, 10.0)
}

impl Scenario {
    fn validate(&self) -> Result<()> {
        let (x, y, z) = self.half_extents;
        ensure!(
            [x, y, z].into_iter().all(valid_half_extent),
            "scenario '{}': half_extents {:?} must be positive and finite",
            self.name,
            self.half_extents
        );
        ensure!(
            PARTICLE_SPEED <= x.min(y).min(z),
            "scenario '{}': box is smaller than one particle step",
            self.name
        );
        Ok(())
    }

    fn bounds(&self) -> Vec3 {
        let (x, y, z) = self.half_extents;
        Vec3::new(x, y, z)
    }

    fn seed(&self) -> u64 {
        0x9E37_79B9_7F4A_7C15_u64 ^ self.particles as u64 ^ self.steps as u64
    }
}

#[derive(Debug, Clone, PartialEq)]
struct BenchArgs {
    scenario_file: PathBuf,
    output: PathBuf,
    repeats: usize,
    warmup: usize,
}

impl Default for BenchArgs {
    fn default() -> Self {
        Self {
            scenario_file: PathBuf::from("perf/scenarios.ron"),
            output: PathBuf::from("perf_results.csv"),
            repeats: 3,
            warmup: 1,
        }
    }
}

impl BenchArgs {
    /// `None` when help was requested.
    fn parse<I>(args: I) -> Result<Option<Self>>
    where
        I: IntoIterator<Item = String>,
    {
        let mut parsed = Self::default();
        let mut iter = args.into_iter();

        while let Some(flag) = iter.next() {
            let mut value = || iter.next().with_context(|| format!("{flag} expects a value"));
            match flag.as_str() {
                "--scenario-file" => parsed.scenario_file = PathBuf::from(value()?),
                "--output" => parsed.output = PathBuf::from(value()?),
                "--repeats" => parsed.repeats = parse_count(&flag, &value()?)?,
                "--warmup" => parsed.warmup = parse_count(&flag, &value()?)?,
                "--help" | "-h" => return Ok(None),
                _ => bail!("unknown argument: {flag}"),
            }
        }

        ensure!(parsed.repeats > 0, "--repeats must be at least 1");
        Ok(Some(parsed))
    }
}

fn parse_count(flag: &str, value: &str) -> Result<usize> {
    value
        .parse()
        .with_context(|| format!("{flag} expects a number, got '{value}'"))
}

/// Per-step timings of one scenario across its repeats.
#[derive(Debug)]
struct Summary {
    min: f64,
    median: f64,
    max: f64,
    checksum: u64,
}

impl Summary {
    fn from_runs(runs: &[(f64, u64)]) -> Option<Self> {
        let mut samples: Vec<f64> = runs.iter().map(|(ns, _)| *ns).collect();
        samples.sort_by(f64::total_cmp);
        Some(Self {
            min: *samples.first()?,
            median: samples[samples.len() / 2],
            max: *samples.last()?,
            checksum: runs.iter().fold(0, |acc, (_, checksum)| acc ^ checksum),
        })
    }

    fn csv_row(&self, scenario: &Scenario) -> String {
        format!(
            "{},{},{},{:.4},{:.4},{:.4},{}",
            scenario.name,
            scenario.particles,
            scenario.steps,
            self.min,
            self.median,
            self.max,
            self.checksum
        )
    }
}

fn main() -> Result<()> {
    let Some(args) = BenchArgs::parse(std::env::args().skip(1))? else {
        print_help();
        return Ok(());
    };
    let scenarios = read_scenarios(&args.scenario_file)?;
    let lights = bench_lights();

    let mut rows = vec![CSV_HEADER.to_string()];
    for scenario in &scenarios {
        for _ in 0..args.warmup {
            run_scenario(scenario, &lights);
        }
        let runs: Vec<(f64, u64)> = (0..args.repeats)
            .map(|_| run_scenario(scenario, &lights))
            .collect();
        let summary = Summary::from_runs(&runs).context("scenario produced no samples")?;

        println!(
            "{:>18}: median={:>10.2} ns/step, min={:>10.2}, max={:>10.2}",
            scenario.name, summary.median, summary.min, summary.max
        );
        rows.push(summary.csv_row(scenario));
    }

    rows.push(String::new());
    fs::write(&args.output, rows.join("\n"))
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    println!("results written to {}", args.output.display());
    Ok(())
}

fn print_help() {
    println!(
        "Usage: scene_bench [options]\n\n\
         --scenario-file <path>  Scenario list (default: perf/scenarios.ron)\n\
         --output <path>         CSV destination (default: perf_results.csv)\n\
         --repeats <n>           Timed runs per scenario (default: 3)\n\
         --warmup <n>            Untimed runs per scenario (default: 1)"
    );
}

fn read_scenarios(path: &Path) -> Result<Vec<Scenario>> {
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let scenarios = parse_scenarios(&content)
        .with_context(|| format!("invalid scenario file {}", path.display()))?;
    ensure!(!scenarios.is_empty(), "no scenarios in {}", path.display());
    Ok(scenarios)
}

fn parse_scenarios(content: &str) -> Result<Vec<Scenario>> {
    let scenarios: Vec<Scenario> = ron::from_str(content)?;
    for scenario in &scenarios {
        scenario.validate()?;
    }
    Ok(scenarios)
}

fn bench_lights() -> Vec<LightSpec> {
    let mut lights = light_table();
    lights.push(ambient_spec());
    lights
}

/// Times `steps` frames of particle drift plus a full light evaluation with
/// a circling pointer. Returns ns per step and a checksum of the results.
fn run_scenario(scenario: &Scenario, lights: &[LightSpec]) -> (f64, u64) {
    let mut rng = StdRng::seed_from_u64(scenario.seed());
    let mut field =
        ParticleField::scatter(scenario.particles, scenario.bounds(), PARTICLE_SPEED, &mut rng);

    let start = Instant::now();
    let mut checksum = 0_u64;

    for step in 0..scenario.steps {
        let t = step as f32 * FRAME_SECONDS;
        let pointer = Vec2::new(t.cos(), t.sin());

        field.step();
        let light_sum: f32 = lights
            .iter()
            .map(|light| {
                let frame = light.evaluate(t, pointer);
                frame.intensity + frame.position.x
            })
            .sum();

        if let Some(probe) = field.positions.get(step % field.len().max(1)) {
            checksum ^= u64::from(probe.x.to_bits()) << 1;
            checksum ^= u64::from(probe.y.to_bits());
        }
        checksum = checksum.rotate_left(1) ^ u64::from(light_sum.to_bits());
    }

    let ns_total = start.elapsed().as_nanos() as f64;
    (ns_total / scenario.steps.max(1) as f64, checksum)
}
