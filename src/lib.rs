//! GA Pipeline - Generational genetic algorithm operators for byte and real genomes.
//!
//! This crate provides the per-generation machinery of a steady-replacement
//! genetic algorithm: a per-objective elite archive, tournament selection,
//! uniform and simulated binary crossover, bit-flip and multiplicative
//! mutation, and end-of-generation cleanup.
//!
//! # Architecture
//!
//! The crate is split into two main modules:
//!
//! - `schema`: Population store and configuration types
//! - `compute`: Operators, reports, and the generation pipeline
//!
//! # Example
//!
//! ```rust,no_run
//! use ga_pipeline::{
//!     schema::{PipelineConfig, Population},
//!     compute::{BytePipeline, GenomeRng, bit_match_squared, evaluate_population},
//! };
//!
//! let target = b"hello, world";
//! let mut rng = GenomeRng::new(42);
//! let mut population = Population::random_bytes(50, target.len(), &mut rng);
//! let mut pipeline = BytePipeline::bytes(PipelineConfig::default().with_seed(42))?;
//!
//! for _ in 0..100 {
//!     evaluate_population(&mut population, |genome| {
//!         vec![bit_match_squared(genome.as_bytes().unwrap_or(&[]), target)]
//!     });
//!     population.flag_worst(0.4, 0, true);
//!     let report = pipeline.step(&mut population);
//!     println!("Generation {}: {} bred", report.generation, report.crossover.bred);
//! }
//! # Ok::<(), ga_pipeline::schema::ConfigError>(())
//! ```

pub mod compute;
pub mod schema;

// Re-export commonly used types
pub use compute::{BytePipeline, GenerationPipeline, GenerationReport, GenomeRng, RealPipeline};
pub use schema::{Genome, Individual, IndividualId, PipelineConfig, Population};
