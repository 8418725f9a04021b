//! GA Pipeline CLI - Evolve a population towards a target from a JSON run file.

use std::time::Instant;

use ga_pipeline::{
    compute::{
        BytePipeline, Crossover, GenerationPipeline, GenomeRng, Mutator, RealPipeline,
        bit_match_max, bit_match_squared, evaluate_population, negative_sse, rmse,
    },
    schema::{Genome, Population, Problem, RunConfig},
};

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <run.json> [generations]", args[0]);
        eprintln!();
        eprintln!("Evolve a population towards a target with the generation pipeline.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  run.json     Path to run configuration file");
        eprintln!("  generations  Generation limit (default: max_generations from the file)");
        eprintln!();
        eprintln!("Example configuration is generated with --example flag.");
        std::process::exit(1);
    }

    if args[1] == "--example" {
        print_example_config();
        return;
    }

    let run = RunConfig::load(&args[1]).unwrap_or_else(|e| {
        eprintln!("Error loading run file: {}", e);
        std::process::exit(1);
    });
    let generations: usize = args
        .get(2)
        .and_then(|s| s.parse().ok())
        .unwrap_or(run.max_generations);

    let config = run.pipeline.clone().with_seed(run.random_seed);
    let mut rng = GenomeRng::from_config_seed(run.random_seed);

    println!("GA Pipeline");
    println!("===========");
    println!("Population: {}", run.population_size);
    println!("Genome length: {}", run.problem.genome_len());
    println!("Replace fraction: {}", run.replace_fraction);
    println!("Generations: {}", generations);
    println!();

    match &run.problem {
        Problem::TargetBytes { text } => {
            let target = text.as_bytes().to_vec();
            let max = bit_match_max(&target);
            let mut pipeline = BytePipeline::bytes(config).unwrap_or_else(|e| {
                eprintln!("Invalid pipeline config: {}", e);
                std::process::exit(1);
            });
            let mut population = Population::random_bytes(run.population_size, target.len(), &mut rng);

            let score = |genome: &Genome| {
                genome
                    .as_bytes()
                    .map(|genes| vec![bit_match_squared(genes, &target)])
                    .unwrap_or_default()
            };
            let best = evolve(&mut pipeline, &mut population, &run, generations, score, |best| {
                best >= max
            });

            println!();
            println!("Best fitness: {:.1} / {:.1}", best.fitness, max);
            if let Some(genes) = best.genome.as_ref().and_then(Genome::as_bytes) {
                println!("Best genome: {:?}", String::from_utf8_lossy(genes));
            }
        }
        Problem::TargetVector { values } => {
            let target = values.clone();
            let mut pipeline = RealPipeline::real(config).unwrap_or_else(|e| {
                eprintln!("Invalid pipeline config: {}", e);
                std::process::exit(1);
            });
            let (lo, hi) = (
                run.pipeline.real_mutation.reset_min.min(run.pipeline.real_mutation.reset_max),
                run.pipeline.real_mutation.reset_min.max(run.pipeline.real_mutation.reset_max),
            );
            let mut population =
                Population::random_reals(run.population_size, target.len(), lo, hi, &mut rng);

            let score = |genome: &Genome| {
                genome
                    .as_real()
                    .map(|genes| vec![negative_sse(genes, &target)])
                    .unwrap_or_default()
            };
            let best = evolve(&mut pipeline, &mut population, &run, generations, score, |best| {
                best >= 0.0
            });

            println!();
            println!("Best fitness: {:.6}", best.fitness);
            if let Some(genes) = best.genome.as_ref().and_then(Genome::as_real) {
                println!("Best genome: {:?}", genes);
                println!("RMSE: {:.6}", rmse(genes, &target));
            }
        }
    }
}

/// Best individual seen at the end of a run.
struct Best {
    fitness: f32,
    genome: Option<Genome>,
}

/// Evaluate, flag, and step until `generations` or until `solved` holds for
/// the best score.
fn evolve<C, M, F, S>(
    pipeline: &mut GenerationPipeline<C, M>,
    population: &mut Population,
    run: &RunConfig,
    generations: usize,
    score: F,
    solved: S,
) -> Best
where
    C: Crossover,
    M: Mutator<Kind = C::Kind>,
    F: Fn(&Genome) -> Vec<f32> + Sync,
    S: Fn(f32) -> bool,
{
    let higher_is_better = pipeline.config().higher_is_better;
    let start = Instant::now();
    let mut anomalies = 0;

    println!("Evolving...");
    for i in 0..generations {
        evaluate_population(population, &score);
        population.flag_worst(run.replace_fraction, 0, higher_is_better);
        let report = pipeline.step(population);
        anomalies += report.anomalies().count();

        let best = report.objectives.first().map(|s| s.best).unwrap_or(f32::NAN);
        if (i + 1) % (generations / 10).max(1) == 0 || solved(best) {
            let summary = report.objectives.first();
            let elapsed = start.elapsed().as_secs_f32();
            println!(
                "  Generation {}/{}: best={:.4}, mean={:.4}, {:.1} gen/s",
                i + 1,
                generations,
                best,
                summary.map(|s| s.mean).unwrap_or(f32::NAN),
                (i + 1) as f32 / elapsed
            );
        }
        if solved(best) {
            break;
        }
    }

    evaluate_population(population, &score);
    if anomalies > 0 {
        println!("Anomalies reported: {}", anomalies);
    }
    println!(
        "Time: {:.2}s, elite slots: {}",
        start.elapsed().as_secs_f32(),
        pipeline.archive().slots(0).len()
    );

    let best = population
        .individuals()
        .iter()
        .filter_map(|ind| ind.fitness.first().map(|&f| (f, ind)))
        .filter(|(f, _)| !f.is_nan())
        .max_by(|a, b| {
            let ord = a.0.total_cmp(&b.0);
            if higher_is_better { ord } else { ord.reverse() }
        });

    match best {
        Some((fitness, ind)) => Best {
            fitness,
            genome: ind.genome.clone(),
        },
        None => Best {
            fitness: f32::NAN,
            genome: None,
        },
    }
}

fn print_example_config() {
    let run = RunConfig::example();

    match serde_json::to_string_pretty(&run) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error serializing example: {}", e);
            std::process::exit(1);
        }
    }
}
