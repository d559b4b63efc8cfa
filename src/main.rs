use anyhow::{Context, Result};
use chrono::Duration;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use structopt::StructOpt;
use tracing_subscriber::EnvFilter;

use gpx_decode::stats::{SegmentStats, StatsOptions};
use gpx_decode::units::Meters;
use gpx_decode::Decoder;

#[derive(Debug, StructOpt)]
struct Args {
    /// Minimum change in elevation (in meters) for a point to contribute to Elevation Gain.
    #[structopt(short = "e", long, parse(try_from_str), default_value = "5")]
    min_elevation_gain: Meters,

    /// Minimum change in distance (in meters) for a point to contribute to Total Distance.
    #[structopt(short = "d", long, parse(try_from_str), default_value = "1")]
    min_distance: Meters,

    /// Minimum time (in seconds) without change in position (per --min-distance) before points do
    /// not contribute to Moving Time.
    #[structopt(short = "t", long, parse(try_from_str = duration_secs), default_value = "10")]
    standstill_time: Duration,

    /// Leave unparsable coordinates, elevations and times unset instead of failing.
    #[structopt(long)]
    lenient: bool,

    /// Also report heart rate and cadence from Garmin TrackPoint extensions.
    #[structopt(short = "x", long)]
    extensions: bool,

    /// More logging; repeat for more. RUST_LOG overrides this.
    #[structopt(short = "v", long, parse(from_occurrences))]
    verbose: u8,

    /// Path to a GPX file to process.
    #[structopt(parse(from_os_str))]
    input_path: PathBuf,
}

fn duration_secs(s: &str) -> Result<Duration> {
    Ok(Duration::seconds(s.parse()?))
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Args::from_args();
    init_logging(args.verbose);

    let input = File::open(&args.input_path)
        .with_context(|| format!("failed to open {:?}", args.input_path))?;

    let doc = Decoder::new(BufReader::new(input))
        .strict(!args.lenient)
        .decode()
        .context("failed to parse GPX")?;

    let options = StatsOptions {
        min_elevation_gain: args.min_elevation_gain,
        min_distance: args.min_distance,
        standstill_time: args.standstill_time,
    };

    let file_name = doc.metadata.name.as_deref();

    println!("input: {:?}", args.input_path);
    println!("parameters:");
    println!("  min elevation gain: {}", options.min_elevation_gain);
    println!("  min distance: {}", options.min_distance);
    println!("  min moving speed = {} m/s", options.min_moving_speed());

    for (tnum, track) in doc.tracks.iter().enumerate() {
        let name = track.name.as_deref().or(file_name).unwrap_or("<unnamed>");

        println!("track {}: {}", tnum + 1, name);

        for (snum, seg) in track.segments.iter().enumerate() {
            println!("  segment {}:", snum + 1);

            let stats = match SegmentStats::compute(seg, &options) {
                Some(stats) => stats,
                None => {
                    println!("    no points");
                    continue;
                }
            };

            println!("    starting elevation: {}", stats.elevation_start.to_feet());
            println!("    ending elevation: {}", stats.elevation_end.to_feet());
            println!("    min elevation: {}", stats.elevation_min.to_feet());
            println!("    max elevation: {}", stats.elevation_max.to_feet());
            println!("    elevation gain: {}", stats.elevation_gain.to_feet());
            println!("    total distance: {}", stats.distance.to_miles());
            println!("    total time: {}", fmt_duration(stats.total_time));
            println!("    moving time: {}", fmt_duration(stats.moving_time));

            if args.extensions {
                match stats.heart_rate {
                    Some(hr) => println!("    average heart rate: {:.0} bpm", hr),
                    None => println!("    average heart rate: n/a"),
                }
                match stats.cadence {
                    Some(cad) => println!("    average cadence: {:.0} rpm", cad),
                    None => println!("    average cadence: n/a"),
                }
            }
        }
    }

    Ok(())
}

fn fmt_duration(d: Duration) -> String {
    let hours = d.num_hours();
    let mins = (d - Duration::hours(hours)).num_minutes();
    format!("{}:{:02}", hours, mins)
}
