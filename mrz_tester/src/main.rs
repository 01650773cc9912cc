// THEORY:
// `mrz_tester` is the hands-on harness for the engine. It mirrors how the
// engine is meant to be used:
//
// - `file` and `folder` run the synchronous `MrzScanner` over still images and
//   print one block per detected MRZ region.
// - `lines` skips recognition entirely and classifies raw MRZ text, which is
//   the quickest way to check a layout by hand.
// - `camera` (feature `camera`) drives the bounded `CapturePipeline` from a live
//   device until Ctrl-C.

#[cfg(feature = "camera")]
mod camera;
mod config;
mod engine;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use config::ScannerConfig;
use engine::CommandRecognizer;
use mrz_vision::{classify, Classification, LineSet, MrzScanner, ScanResult};
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "mrz_tester", about = "Scan machine-readable zones from images, text or a camera")]
struct Cli {
    /// TOML config with [pipeline], [engine] and [camera] tables
    #[arg(long, global = true, value_name = "TOML")]
    config: Option<PathBuf>,

    /// External recognizer program (overrides [engine].program)
    #[arg(long, global = true, env = "MRZ_ENGINE", value_name = "PROGRAM")]
    engine: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Frames allowed in the recognizer at once (overrides [pipeline].max_in_flight)
    #[arg(long, global = true)]
    max_in_flight: Option<usize>,

    #[command(subcommand)]
    command: Mode,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Scan one image file
    File { path: PathBuf },
    /// Scan every image in a directory
    Folder { dir: PathBuf },
    /// Classify raw MRZ lines from a file or stdin; blank lines separate zones
    Lines { file: Option<PathBuf> },
    /// Scan a live camera until Ctrl-C
    #[cfg(feature = "camera")]
    Camera {
        /// Capture device index (overrides [camera].device)
        #[arg(long)]
        device: Option<i32>,
    },
}

fn load_config(cli: &Cli) -> anyhow::Result<ScannerConfig> {
    let mut config = match &cli.config {
        Some(path) => ScannerConfig::load(path)?,
        None => ScannerConfig::default(),
    };
    if let Some(program) = &cli.engine {
        config.engine.program = Some(program.clone());
    }
    if let Some(max_in_flight) = cli.max_in_flight {
        config.pipeline.max_in_flight = max_in_flight;
        config.pipeline = config.pipeline.validated()?;
    }
    Ok(config)
}

fn build_scanner(config: &ScannerConfig) -> anyhow::Result<MrzScanner> {
    let Some(program) = &config.engine.program else {
        bail!("no recognizer configured; pass --engine or set [engine].program");
    };
    let recognizer = CommandRecognizer::new(program.clone(), config.engine.args.clone());
    let scanner = MrzScanner::new(Arc::new(recognizer));
    Ok(if config.pipeline.locate_portraits {
        scanner
    } else {
        scanner.without_portraits()
    })
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_results(source: &Path, results: &[ScanResult], json: bool) -> anyhow::Result<()> {
    if json {
        #[derive(Serialize)]
        struct FileResults<'a> {
            source: &'a Path,
            results: &'a [ScanResult],
        }
        return print_json(&FileResults { source, results });
    }
    if results.is_empty() {
        println!("{}: no MRZ found", source.display());
        return Ok(());
    }
    println!("{}: found {} MRZ region(s)", source.display(), results.len());
    for result in results {
        print!("{result}");
        if let Some(zone) = &result.portrait_zone {
            println!("\tPortraitZone: {:?}", zone.points);
        }
        println!();
    }
    Ok(())
}

fn scan_file(scanner: &MrzScanner, path: &Path, json: bool) -> anyhow::Result<()> {
    let image = image::open(path)
        .with_context(|| format!("decoding {}", path.display()))?
        .to_rgb8();
    let results = scanner.scan(image)?;
    print_results(path, &results, json)
}

fn scan_folder(scanner: &MrzScanner, dir: &Path, json: bool) -> anyhow::Result<()> {
    let source = mrz_vision::ImageSequenceSource::from_dir(dir)?;
    for path in source.paths() {
        // One unreadable file should not end a batch.
        if let Err(e) = scan_file(scanner, path, json) {
            log::warn!("skipping {}: {e:#}", path.display());
        }
    }
    Ok(())
}

/// Zones are separated by blank lines; `lines()` also strips CRLF endings.
fn split_zones(text: &str) -> Vec<LineSet> {
    let mut zones = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                zones.push(LineSet::new(current.drain(..)));
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        zones.push(LineSet::new(current));
    }
    zones
}

fn classify_text(file: Option<&Path>, json: bool) -> anyhow::Result<()> {
    let mut text = String::new();
    match file {
        Some(path) => {
            text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?
        }
        None => {
            std::io::stdin().read_to_string(&mut text)?;
        }
    }

    for zone in split_zones(&text) {
        let classification = classify(&zone);
        if json {
            print_json(&classification)?;
            continue;
        }
        match &classification {
            Classification::Matched { document_type, fields } => {
                println!("DocumentType: {document_type}");
                for (field, value) in fields.iter() {
                    println!("\t{field:?}: {} ({:?})", value.value, value.status);
                }
            }
            Classification::NoMatch => println!("No match:\n{zone}"),
        }
        println!();
    }
    Ok(())
}

#[cfg(feature = "camera")]
async fn scan_camera(config: ScannerConfig, device: Option<i32>, json: bool) -> anyhow::Result<()> {
    use mrz_vision::{CapturePipeline, PipelineEvent};

    let scanner = build_scanner(&config)?;
    let pipeline = CapturePipeline::new(scanner, config.pipeline.clone())?;
    let mut listener = pipeline.add_listener();
    let source = camera::CameraSource::new(
        device.unwrap_or(config.camera.device),
        config.camera.width,
        config.camera.height,
    );
    pipeline.start_stream(Box::new(source))?;
    println!("Scanning, press Ctrl-C to stop");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = listener.recv() => match event {
                Some(PipelineEvent::Completed(report)) => {
                    if json {
                        print_json(report.as_ref())?;
                    } else {
                        for result in report.matched() {
                            println!("frame {}:\n{result}", report.frame_id);
                        }
                    }
                }
                Some(PipelineEvent::Failed { frame_id, error }) => log::warn!("frame {frame_id}: {error}"),
                None => break,
            },
        }
    }

    let stop = pipeline.stop_stream().await;
    let stats = pipeline.stats();
    log::info!(
        "read {} frame(s): {} submitted, {} dropped, {} completed, {} failed, {} detached",
        stop.frames_read,
        stats.submitted,
        stats.dropped,
        stats.completed,
        stats.failed,
        stop.detached_workers
    );
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match &cli.command {
        Mode::File { path } => scan_file(&build_scanner(&config)?, path, cli.json),
        Mode::Folder { dir } => scan_folder(&build_scanner(&config)?, dir, cli.json),
        Mode::Lines { file } => classify_text(file.as_deref(), cli.json),
        #[cfg(feature = "camera")]
        Mode::Camera { device } => {
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(scan_camera(config, *device, cli.json))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crlf_input_splits_into_zones() {
        let text = "P<UTOERIKSSON<<ANNA<MARIA<<<<<<<<<<<<<<<<<<<\r\n\
                    L898902C36UTO7408122F1204159ZE184226B<<<<<10\r\n\
                    \r\n\
                    \r\n\
                    I<UTOD231458907<<<<<<<<<<<<<<<\r\n\
                    7408122F1204159UTO<<<<<<<<<<<6\r\n\
                    ERIKSSON<<ANNA<MARIA<<<<<<<<<<\r\n";
        let zones = split_zones(text);
        assert_eq!(zones.len(), 2);
        assert_eq!(zones[0].line_lengths(), vec![44, 44]);
        assert_eq!(zones[1].line_lengths(), vec![30, 30, 30]);
        assert!(classify(&zones[0]).is_match());
        assert!(classify(&zones[1]).is_match());
    }

    #[test]
    fn whitespace_only_lines_separate_zones() {
        let zones = split_zones("AAA\n   \nBBB\nCCC\n\n");
        assert_eq!(zones.len(), 2);
        assert_eq!(zones[1].lines(), ["BBB", "CCC"]);
    }
}
