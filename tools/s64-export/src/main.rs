//! s64-export - Sausage64 model exporter
//!
//! Compiles a `.s64` scene (plus an optional material description file)
//! into a C header with RSP display lists, a compact binary asset, or an
//! OpenGL-oriented C header.

use anyhow::{bail, Context, Result};
use clap::Parser;
use s64_export::{material, optimizer, output, parser, Config};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "s64-export")]
#[command(about = "Sausage64 model exporter")]
#[command(version)]
struct Cli {
    /// The .s64 model file to load
    #[arg(short = 'f', value_name = "FILE")]
    file: PathBuf,

    /// A list of materials and their data
    #[arg(short = 't', value_name = "FILE")]
    materials: Option<PathBuf>,

    /// Export as C structs instead of a binary asset
    #[arg(short = 's')]
    structs: bool,

    /// Export an OpenGL compatible model instead
    #[arg(short = 'g')]
    opengl: bool,

    /// Vertex cache size
    #[arg(short = 'c', value_name = "INT", default_value_t = 32)]
    cache_size: usize,

    /// Omit the initial display list setup
    #[arg(short = 'i')]
    omit_initial_setup: bool,

    /// Model name
    #[arg(short = 'n', value_name = "NAME", default_value = "MyModel")]
    name: String,

    /// Output filename, without extension
    #[arg(short = 'o', value_name = "FILE", default_value = "outdlist")]
    output: String,

    /// Disable the two-triangle optimization
    #[arg(short = '2')]
    no_two_tri: bool,

    /// Quiet mode
    #[arg(short = 'q')]
    quiet: bool,

    /// Don't rebase coordinates and translations against mesh roots
    #[arg(short = 'r')]
    no_root_fix: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging; quiet mode only surfaces warnings.
    let default_level = if cli.quiet {
        tracing::Level::WARN
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(default_level.into()),
        )
        .init();

    if cli.cache_size < 3 {
        bail!("Vertex cache size can't be smaller than a triangle");
    }

    let config = Config {
        model_name: cli.name,
        output_name: cli.output,
        cache_size: cli.cache_size,
        binary_out: !cli.structs,
        opengl: cli.opengl,
        fix_root: !cli.no_root_fix,
        initial_load_elided: cli.omit_initial_setup,
        no_two_tri: cli.no_two_tri,
    };

    // Materials first, so face references resolve while parsing the scene.
    let mut materials = material::MaterialTable::new();
    if let Some(path) = &cli.materials {
        let file =
            File::open(path).with_context(|| format!("Unable to open file '{:?}'", path))?;
        material::parse_material_file(BufReader::new(file), &mut materials)?;
    }

    let file =
        File::open(&cli.file).with_context(|| format!("Unable to open file '{:?}'", cli.file))?;
    let mut scene = parser::parse_scene(BufReader::new(file), materials, config.fix_root)?;

    optimizer::optimize_scene(&mut scene, config.cache_size);

    if config.binary_out {
        output::write_output_binary(&scene, &config)?;
    } else {
        output::write_output_text(&scene, &config)?;
    }
    Ok(())
}
