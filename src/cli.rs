use std::path::PathBuf;

use anyhow::{Result, anyhow, bail};

use crate::constants::COMPOSITE_OUTPUT;
use crate::coord::{Dms, Sign};

const USAGE: &str = "Usage: satmosaic acquire <subject> --lon <sign:deg:min:sec> --lat <sign:deg:min:sec> [--config <file>] [--base-dir <dir>]
       satmosaic assemble <manifest> [--output <file>]
       satmosaic run <subject> --lon <sign:deg:min:sec> --lat <sign:deg:min:sec> [--config <file>] [--base-dir <dir>] [--output <file>]
Signs are 'p' (positive) or 'n' (negative), e.g. --lat p:48:51:29.6";

pub enum Command {
    Acquire(AcquireConfig),
    Assemble(AssembleConfig),
    Run(RunConfig),
}

pub struct AcquireConfig {
    pub subject: String,
    pub lon: Dms,
    pub lat: Dms,
    pub config: Option<PathBuf>,
    pub base_dir: Option<PathBuf>,
}

pub struct AssembleConfig {
    pub manifest: PathBuf,
    pub output: PathBuf,
}

pub struct RunConfig {
    pub acquire: AcquireConfig,
    pub output: PathBuf,
}

pub fn parse_args(args: &[String]) -> Result<Command> {
    if args.is_empty() {
        bail!("No arguments supplied.\n{USAGE}");
    }
    match args[0].as_str() {
        "--help" | "-h" => {
            println!("{USAGE}");
            std::process::exit(0);
        }
        "acquire" => {
            let (config, output) = parse_acquisition(&args[1..])?;
            if output.is_some() {
                bail!("--output only applies to assemble and run\n{USAGE}");
            }
            Ok(Command::Acquire(config))
        }
        "assemble" => parse_assemble(&args[1..]).map(Command::Assemble),
        "run" => {
            let (acquire, output) = parse_acquisition(&args[1..])?;
            Ok(Command::Run(RunConfig {
                acquire,
                output: output.unwrap_or_else(|| PathBuf::from(COMPOSITE_OUTPUT)),
            }))
        }
        other => bail!("Unknown command '{other}'\n{USAGE}"),
    }
}

fn parse_acquisition(args: &[String]) -> Result<(AcquireConfig, Option<PathBuf>)> {
    let mut subject = None;
    let mut lon = None;
    let mut lat = None;
    let mut config = None;
    let mut base_dir = None;
    let mut output = None;

    let mut i = 0;
    while i < args.len() {
        let arg = &args[i];
        if arg == "--help" || arg == "-h" {
            println!("{USAGE}");
            std::process::exit(0);
        } else if arg == "--lon" {
            lon = Some(parse_dms(flag_value(args, &mut i, "--lon")?)?);
        } else if arg == "--lat" {
            lat = Some(parse_dms(flag_value(args, &mut i, "--lat")?)?);
        } else if arg == "--config" {
            config = Some(PathBuf::from(flag_value(args, &mut i, "--config")?));
        } else if arg == "--base-dir" {
            base_dir = Some(PathBuf::from(flag_value(args, &mut i, "--base-dir")?));
        } else if arg == "--output" {
            output = Some(PathBuf::from(flag_value(args, &mut i, "--output")?));
        } else if subject.is_none() && !arg.starts_with('-') {
            subject = Some(arg.clone());
        } else {
            bail!("Unexpected argument: {arg}\n{USAGE}");
        }
        i += 1;
    }

    let subject = subject.ok_or_else(|| anyhow!("Missing subject argument.\n{USAGE}"))?;
    if subject.trim().is_empty() {
        bail!("Subject must not be empty.\n{USAGE}");
    }
    let lon = lon.ok_or_else(|| anyhow!("Missing --lon.\n{USAGE}"))?;
    let lat = lat.ok_or_else(|| anyhow!("Missing --lat.\n{USAGE}"))?;

    Ok((
        AcquireConfig {
            subject,
            lon,
            lat,
            config,
            base_dir,
        },
        output,
    ))
}

fn parse_assemble(args: &[String]) -> Result<AssembleConfig> {
    if args.is_empty() || args[0] == "--help" || args[0] == "-h" {
        println!("{USAGE}");
        std::process::exit(0);
    }

    let mut manifest = None;
    let mut output = None;
    let mut i = 0;
    while i < args.len() {
        let arg = &args[i];
        if arg == "--output" {
            output = Some(PathBuf::from(flag_value(args, &mut i, "--output")?));
        } else if manifest.is_none() && !arg.starts_with('-') {
            manifest = Some(PathBuf::from(arg));
        } else {
            bail!("Unexpected argument: {arg}\n{USAGE}");
        }
        i += 1;
    }

    let manifest = manifest.ok_or_else(|| anyhow!("Missing manifest argument.\n{USAGE}"))?;
    Ok(AssembleConfig {
        manifest,
        output: output.unwrap_or_else(|| PathBuf::from(COMPOSITE_OUTPUT)),
    })
}

fn flag_value<'a>(args: &'a [String], i: &mut usize, flag: &str) -> Result<&'a str> {
    *i += 1;
    if *i >= args.len() {
        bail!("Missing value for {flag}\n{USAGE}");
    }
    Ok(&args[*i])
}

/// Parses a `sign:deg:min:sec` token, e.g. `p:48:51:29.6`. Range checks
/// against the axis happen later in the conversion itself.
fn parse_dms(token: &str) -> Result<Dms> {
    let parts: Vec<&str> = token.split(':').collect();
    if parts.len() != 4 {
        bail!("Invalid coordinate '{token}' (expected sign:deg:min:sec)");
    }
    let sign = Sign::from_token(parts[0])?;
    let degree: u32 = parts[1]
        .parse()
        .map_err(|_| anyhow!("Invalid degree '{}' in '{token}'", parts[1]))?;
    let minute: u32 = parts[2]
        .parse()
        .map_err(|_| anyhow!("Invalid minute '{}' in '{token}'", parts[2]))?;
    let second: f64 = parts[3]
        .parse()
        .map_err(|_| anyhow!("Invalid second '{}' in '{token}'", parts[3]))?;
    Ok(Dms {
        sign,
        degree,
        minute,
        second,
    })
}
