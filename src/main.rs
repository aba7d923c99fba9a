// The report commands write their tables to stdout.
#![allow(clippy::print_stdout)]

//! Command-line front end for the repro layout checks.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use gpu_repro::error::ReproError;
use gpu_repro::gpu::context::GpuContext;
use gpu_repro::gpu::occlusion::{OcclusionPipelines, OcclusionRun};
use gpu_repro::gpu::pipeline::ReproPipelines;
use gpu_repro::layout::{occlusion, stencil_clear, texture_to_buffer, FieldLayout, GpuLayout};
use gpu_repro::options::ReproOptions;
use gpu_repro::repro::occlusion::{expected_outcomes, iteration_draws};
use gpu_repro::shaders::{self, Repro};

#[derive(Parser)]
#[command(name = "gpu-repro", about = "Host/shader layout checks for GPU bug repros")]
struct Cli {
    /// Options file (TOML). Defaults apply when omitted.
    #[arg(long, global = true)]
    options: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print every host struct with its field offsets.
    Layouts,
    /// Check every shader struct against its host layout.
    Check,
    /// Print the expected occlusion-query result of every iteration.
    Occlusion,
    /// Build every pipeline on a headless device.
    Pipelines,
    /// Run the occlusion iterations on a headless device and report each.
    RunOcclusion,
    /// Print the options JSON schema.
    Schema,
    /// Write the default options to a TOML file.
    InitOptions {
        /// Destination path.
        path: PathBuf,
    },
}

fn print_layout<T: GpuLayout>(repro: &str) {
    println!("{repro}::{} ({} bytes)", T::NAME, T::size());
    for FieldLayout {
        name,
        offset,
        format,
    } in T::FIELDS
    {
        println!("  {offset:>3}  {name:<14} {format}");
    }
}

fn run(cli: Cli) -> Result<(), ReproError> {
    let options = match &cli.options {
        Some(path) => ReproOptions::load(path)?,
        None => ReproOptions::default(),
    };

    match cli.command {
        Command::Layouts => {
            print_layout::<occlusion::Vertex>("occlusion");
            print_layout::<occlusion::CombineVisibilityResultOptions>("occlusion");
            print_layout::<stencil_clear::Vertex>("stencil_clear");
            print_layout::<texture_to_buffer::Vertex>("texture_to_buffer");
        }
        Command::Check => {
            for repro in Repro::all() {
                shaders::verify_repro(repro)?;
                println!("{}: ok", repro.file_name());
            }
        }
        Command::Occlusion => {
            for outcome in expected_outcomes(options.occlusion.iterations) {
                println!(
                    "{outcome} ({} draws)",
                    iteration_draws(outcome.index).len()
                );
            }
        }
        Command::Pipelines => {
            let context = pollster::block_on(GpuContext::headless(&options.gpu))?;
            let pipelines = ReproPipelines::build(
                &context,
                options.occlusion.combine_with_existing_result,
                &options.stencil_clear,
                &options.texture_to_buffer,
            )?;
            println!(
                "{}: stencil clear {}, {} texture-to-buffer pipeline(s)",
                context.adapter_info.name,
                if pipelines.stencil_clear.is_some() {
                    "built"
                } else {
                    "unsupported"
                },
                pipelines.texture_to_buffer.len()
            );
        }
        Command::RunOcclusion => {
            let context = pollster::block_on(GpuContext::headless(&options.gpu))?;
            let pipelines = OcclusionPipelines::build(
                &context.device,
                options.occlusion.combine_with_existing_result,
            )?;
            let outcomes = OcclusionRun::new(&context, &pipelines)?
                .run(options.occlusion.iterations)?;
            for outcome in &outcomes {
                println!("{outcome}");
            }
            let bad = outcomes.iter().filter(|o| !o.is_ok()).count();
            println!("{}: {bad} of {} iterations bad", context.adapter_info.name, outcomes.len());
        }
        Command::Schema => {
            let schema = serde_json::to_string_pretty(&ReproOptions::json_schema())
                .map_err(|e| ReproError::OptionsParse(e.to_string()))?;
            println!("{schema}");
        }
        Command::InitOptions { path } => {
            options.save(&path)?;
            log::info!("wrote {}", path.display());
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
