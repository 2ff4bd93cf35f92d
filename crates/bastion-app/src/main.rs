//! The `bastion` command-line tool.

use std::process::ExitCode;

use bastion_app::{Bastion, BastionError, PlatformDirs, WorldFixture};
use bastion_config::{CliArgs, Command, Config, PointArgs};
use bastion_geometry::{BlockPos, PartitionId, WorldPoint};
use bastion_region::PlayerId;
use clap::Parser;

/// Exit status of a `check` that was denied.
const DENIED: u8 = 2;

fn main() -> ExitCode {
    let args = CliArgs::parse();
    match run(&args) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &CliArgs) -> Result<ExitCode, BastionError> {
    let dirs = match (&args.config, PlatformDirs::resolve()) {
        (Some(dir), Ok(dirs)) => dirs.with_config_dir(dir.clone()),
        (Some(dir), Err(_)) => PlatformDirs::resolve_with_root(dir).with_config_dir(dir.clone()),
        (None, resolved) => resolved?,
    };
    dirs.create_dirs()?;

    let mut config = Config::load_or_create(&dirs.config_dir)?;
    config.apply_cli_overrides(args);
    config.validate()?;
    bastion_log::init_logging(Some(&dirs.log_dir), false, Some(&config));

    let fixture = match &args.world {
        Some(path) => WorldFixture::load(path)?,
        None if dirs.default_world().exists() => WorldFixture::load(&dirs.default_world())?,
        None => {
            tracing::info!("no world fixture given, starting with an empty world");
            WorldFixture::default()
        }
    };
    let bastion = Bastion::from_fixture(&fixture, &config)?;

    match &args.command {
        Command::Check {
            player,
            point,
            permission,
        } => {
            let player = PlayerId::new(player.as_str());
            let verdict = bastion.check_at(&player, world_point(point), permission);
            println!("{verdict}");
            Ok(if verdict.allowed() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(DENIED)
            })
        }
        Command::Regions { point } => {
            let point = world_point(point);
            let matches = bastion.regions_at(point);
            if matches.is_empty() {
                println!("no regions at {point}");
            }
            for found in &matches {
                let bounds = &found.region.bounds;
                println!(
                    "{}\tdepth {}\towner {}\t{} .. {}\t{} blocks",
                    found.id,
                    found.depth,
                    found.region.owner,
                    bounds.min,
                    bounds.max,
                    bounds.volume()
                );
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn world_point(args: &PointArgs) -> WorldPoint {
    WorldPoint::new(
        PartitionId(args.partition),
        BlockPos::new(args.x, args.y, args.z),
    )
}
