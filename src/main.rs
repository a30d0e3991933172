//! Constraint Packer CLI
//!
//! Usage:
//!   constraint-packer [OPTIONS] [FILE]
//!
//! Options:
//!   -W, --width <W>    Container width (overrides the scene)
//!   -H, --height <H>   Container height (overrides the scene)
//!   -p, --preferred    Print the minimum and natural container size instead
//!   -d, --debug        Log solver activity to stderr
//!   -h, --help         Print help

use std::fs;
use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use constraint_packer::{PackerConfig, Scene, SceneLayout, Size};

#[derive(Parser)]
#[command(name = "constraint-packer")]
#[command(about = "Lay out a scene of items with linear constraints")]
struct Cli {
    /// Scene file in TOML format (reads from stdin if not provided)
    input: Option<PathBuf>,

    /// Container width, overriding the scene's `[container]` table
    #[arg(short = 'W', long)]
    width: Option<f64>,

    /// Container height, overriding the scene's `[container]` table
    #[arg(short = 'H', long)]
    height: Option<f64>,

    /// Print the minimum and natural container size instead of laying out
    #[arg(short, long)]
    preferred: bool,

    /// Debug mode: log rebuilds, allocations and suggestions
    #[arg(short, long)]
    debug: bool,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    if cli.input.is_none() && io::stdin().is_terminal() {
        print_intro();
        return;
    }

    let source = match &cli.input {
        Some(path) => match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                eprintln!("Error reading file '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => {
            let mut buffer = String::new();
            match io::stdin().read_to_string(&mut buffer) {
                Ok(_) => buffer,
                Err(e) => {
                    eprintln!("Error reading from stdin: {}", e);
                    std::process::exit(1);
                }
            }
        }
    };

    let scene = match Scene::from_str(&source) {
        Ok(scene) => scene,
        Err(e) => {
            eprintln!("Error: {}", e.report());
            std::process::exit(1);
        }
    };

    let mut layout = match SceneLayout::build(&scene, PackerConfig::default()) {
        Ok(layout) => layout,
        Err(e) => {
            eprintln!("Error: {}", e.report());
            std::process::exit(1);
        }
    };

    let (minimum, natural) = match layout.preferred_size() {
        Ok(sizes) => sizes,
        Err(e) => {
            eprintln!("Error: {}", e.report());
            std::process::exit(1);
        }
    };

    if cli.preferred {
        println!("minimum: w={} h={}", minimum.width, minimum.height);
        println!("natural: w={} h={}", natural.width, natural.height);
        return;
    }

    let size = Size::new(
        cli.width
            .or(scene.container.width)
            .unwrap_or(natural.width),
        cli.height
            .or(scene.container.height)
            .unwrap_or(natural.height),
    );
    if let Err(e) = layout.allocate(size) {
        eprintln!("Error: {}", e.report());
        std::process::exit(1);
    }

    println!("container: w={} h={}", size.width, size.height);
    for (name, rect) in layout.results() {
        println!("{}: {}", name, rect);
    }
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("constraint_packer=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn print_intro() {
    println!(
        r#"Constraint Packer - lay out a scene of items with linear constraints

USAGE:
    constraint-packer [OPTIONS] [FILE]
    cat scene.toml | constraint-packer

OPTIONS:
    -W, --width        Container width
    -H, --height       Container height
    -p, --preferred    Print minimum and natural container size
    -d, --debug        Log solver activity to stderr
    -h, --help         Print help

SCENE FORMAT:
    constraints = ["a.right + 10 <= b.left", "b.right <= container.right"]

    [container]
    width = 300.0
    height = 100.0

    [[item]]
    name = "a"
    minimum = [40.0, 20.0]
    natural = [120.0, 40.0]
    constraints = ["a.left == container.left"]

Properties: left (x), top (y), width, height, right, bottom, center_x, center_y
Strengths:  @required, @strong, @medium, @weak, optionally weighted: @weak(2.5)"#
    );
}
