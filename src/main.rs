use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use juggle_core::{Pattern, Segment, Vec3};
use juggle_lib::{init_tracing, Fixture, JuggleConfig, Performer, RoutineLibrary};
use juggle_notation::{evaluate_with_limits, format, format_compact, parse};
use juggle_physics::{calc_init_vel, BounceParams, Trajectory};
use serde_json::json;
use std::path::PathBuf;
use tracing::debug;

#[derive(Parser)]
#[command(name = "juggle")]
#[command(about = "MHN+ juggling pattern compiler, transition finder and throw solver", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Log more (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that a pattern is well formed and collision free
    Validate {
        /// Pattern in array (`[[[1,2]],[[0,2]]]`) or compact (`531`) notation
        pattern: String,
    },
    /// Print the number of props
    Props { pattern: String },
    /// Print the canonical nested-array form
    Mhn {
        pattern: String,

        /// Print compact siteswap instead, when possible
        #[arg(long)]
        compact: bool,
    },
    /// Print the landing state
    State { pattern: String },
    /// Find the throws leading from one pattern into another
    Transition { from: String, to: String },
    /// List upcoming throw events
    Events {
        pattern: String,

        /// Beats to list (default: lookahead_beats from the config)
        #[arg(short, long)]
        beats: Option<usize>,
    },
    /// Solve the launch velocity of a single throw
    Solve {
        /// Flight time in seconds
        #[arg(short, long)]
        time: f64,

        /// Horizontal offset of the catch
        #[arg(long, default_value = "0")]
        dx: f64,

        /// Height of the catch relative to the release
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        dy: f64,

        #[arg(long, default_value = "0")]
        dz: f64,

        /// Release height above the floor
        #[arg(long, default_value = "1")]
        height: f64,

        /// Floor bounces
        #[arg(short, long, default_value = "0")]
        bounces: u32,

        /// Throw down into the first bounce
        #[arg(long)]
        force_throw: bool,

        /// Catch while the prop is still rising
        #[arg(long)]
        early_catch: bool,
    },
    /// Play a pattern between fixed hands and report every throw
    Perform {
        pattern: String,

        #[arg(short, long, default_value = "16")]
        beats: usize,

        /// Distance between neighbouring hands in metres
        #[arg(long, default_value = "0.4")]
        spacing: f64,

        /// Hand height in metres
        #[arg(long, default_value = "1")]
        height: f64,
    },
    /// Plan a routine from a JSON routine library
    Routine {
        /// Library file with `patterns` and `routines`
        file: PathBuf,

        /// Routine to plan
        name: String,

        /// Cycles to plan
        #[arg(short = 'n', long, default_value = "8")]
        cycles: usize,
    },
}

fn load_pattern(source: &str, config: &JuggleConfig) -> Result<Pattern> {
    let ast = parse(source).with_context(|| format!("Failed to parse '{}'", source))?;
    let mut pattern = evaluate_with_limits(&ast, config.limits())
        .with_context(|| format!("Invalid pattern '{}'", source))?;
    pattern.set_dwell(config.timing.pre_dwell, config.timing.post_dwell)?;
    Ok(pattern)
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose).context("Failed to install tracing subscriber")?;

    let config = match &cli.config {
        Some(path) => JuggleConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => JuggleConfig::default(),
    };
    debug!(?config, "configuration");
    let seconds = |t: f64| t * config.timing.beat_duration;

    match cli.command {
        Commands::Validate { pattern } => {
            let result = parse(&pattern).and_then(|ast| evaluate_with_limits(&ast, config.limits()));
            match result {
                Ok(p) => {
                    let collisions = p.collisions();
                    if cli.json {
                        print_json(&json!({
                            "valid": collisions.is_empty(),
                            "props": p.props(),
                            "collisions": collisions,
                        }))?;
                    } else if collisions.is_empty() {
                        println!("✓ Pattern is valid ({} props)", p.props());
                    } else {
                        for c in &collisions {
                            println!(
                                "✗ row {} column {}: {} arriving, {} thrown",
                                c.row, c.col, c.arriving, c.departing
                            );
                        }
                    }
                    if !collisions.is_empty() {
                        std::process::exit(1);
                    }
                    Ok(())
                }
                Err(e) => {
                    if cli.json {
                        print_json(&json!({ "valid": false, "error": e.to_string() }))?;
                    } else {
                        eprintln!("✗ {}", e);
                    }
                    std::process::exit(1);
                }
            }
        }
        Commands::Props { pattern } => {
            let p = load_pattern(&pattern, &config)?;
            if cli.json {
                print_json(&json!({ "props": p.props() }))
            } else {
                println!("{}", p.props());
                Ok(())
            }
        }
        Commands::Mhn { pattern, compact } => {
            let p = load_pattern(&pattern, &config)?;
            if compact {
                match format_compact(&p) {
                    Some(text) => println!("{}", text),
                    None => bail!("'{}' has no compact siteswap form", pattern),
                }
            } else if cli.json {
                print_json(&p.get_mhn())?;
            } else {
                println!("{}", format(&p.get_mhn()));
            }
            Ok(())
        }
        Commands::State { pattern } => {
            let state = load_pattern(&pattern, &config)?.state()?;
            if cli.json {
                print_json(&state)
            } else {
                println!("{}", state);
                Ok(())
            }
        }
        Commands::Transition { from, to } => {
            let a = load_pattern(&from, &config)?;
            let b = load_pattern(&to, &config)?;
            let transition = a
                .get_transition(&b)
                .with_context(|| format!("No transition from '{}' to '{}'", from, to))?;
            if cli.json {
                print_json(&json!({
                    "length": transition.len(),
                    "throws": transition.to_mhn(),
                }))
            } else if transition.is_empty() {
                println!("(none needed)");
                Ok(())
            } else {
                println!("{}", format(&transition.to_mhn()));
                Ok(())
            }
        }
        Commands::Events { pattern, beats } => {
            let p = load_pattern(&pattern, &config)?;
            let events = p.lookahead(beats.unwrap_or(config.lookahead_beats))?;
            if cli.json {
                return print_json(&events);
            }
            for e in &events {
                println!(
                    "{:>8.3}s  row {} beat {:>3} -> row {} beat {:>3}  air {:.3}s{}",
                    seconds(e.release_time),
                    e.loc.row,
                    e.beat,
                    e.dest_row,
                    e.land_beat,
                    seconds(e.flight_time),
                    if e.bounces > 0 {
                        format!("  ({} bounces)", e.bounces)
                    } else {
                        String::new()
                    }
                );
            }
            Ok(())
        }
        Commands::Solve {
            time,
            dx,
            dy,
            dz,
            height,
            bounces,
            force_throw,
            early_catch,
        } => {
            let physics = config.physics();
            let origin = Vec3::new(0.0, physics.floor + height, 0.0);
            let dest = origin + Vec3::new(dx, dy, dz);
            let params = BounceParams::new(bounces)
                .force_throw(force_throw)
                .early_catch(early_catch);
            let velocity = calc_init_vel(time, origin, dest, &physics, &params)
                .context("No launch velocity found")?;
            let trajectory = Trajectory::new(origin, velocity, &physics, bounces);
            if cli.json {
                print_json(&json!({
                    "velocity": velocity,
                    "bounce_times": trajectory.bounce_times(),
                    "landing": trajectory.position(time),
                }))
            } else {
                println!("velocity {}", velocity);
                for (i, t) in trajectory.bounce_times().iter().enumerate() {
                    println!("bounce {} at {:.4}s", i + 1, t);
                }
                println!("position at {:.4}s: {}", time, trajectory.position(time));
                Ok(())
            }
        }
        Commands::Perform {
            pattern,
            beats,
            spacing,
            height,
        } => {
            let p = load_pattern(&pattern, &config)?;
            let hands = Fixture::row(p.num_rows(), spacing, height);
            let mut performer = Performer::new(p, hands, &config)?;
            let reports = performer.run(beats)?;
            if cli.json {
                print_json(&reports)?;
            } else {
                for report in &reports {
                    for t in &report.thrown {
                        println!(
                            "{:>8.3}s  prop {} row {} -> row {}  v = {}",
                            t.release, t.prop, t.row, t.dest_row, t.velocity
                        );
                    }
                    for prop in &report.dropped {
                        println!("{:>8.3}s  prop {} dropped", report.time, prop);
                    }
                }
            }
            if !performer.dropped().is_empty() {
                bail!("{} props dropped", performer.dropped().len());
            }
            Ok(())
        }
        Commands::Routine { file, name, cycles } => {
            let library = RoutineLibrary::load(&file)
                .with_context(|| format!("Failed to load routines from {}", file.display()))?;
            let routines = library.build(config.limits())?;
            let plan = routines
                .plan(&name, cycles)
                .with_context(|| format!("Failed to plan routine '{}'", name))?;

            let describe = |segment: &Segment| match segment {
                Segment::Play(pattern) => json!({ "play": pattern }),
                Segment::Transition { from, to, transition } => json!({
                    "transition": { "from": from, "to": to, "throws": transition.to_mhn() }
                }),
            };
            if cli.json {
                let segments: Vec<_> = plan.iter().map(describe).collect();
                return print_json(&segments);
            }
            for segment in &plan {
                match segment {
                    Segment::Play(pattern) => println!("play {}", pattern),
                    Segment::Transition { from, to, transition } => {
                        println!("  {} -> {}: {}", from, to, format(&transition.to_mhn()))
                    }
                }
            }
            Ok(())
        }
    }
}
