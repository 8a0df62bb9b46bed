use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use log::error;

use legacyraw_core::decoders::registry::TableIdentifier;
use legacyraw_core::decoders::DecodeAuxiliary;
use legacyraw_core::pipeline::{run, DemosaicAlgorithm, PipelineOptions};
use legacyraw_core::sink::{GammaOptions, ImageSink, Ppm24Sink, Ppm48Sink, Psd48Sink};
use legacyraw_core::Identifier;

/// Decode raw sensor files from late-1990s/early-2000s digital cameras.
#[derive(Parser, Debug)]
#[command(name = "legacyraw", version, about)]
struct Cli {
    /// Raw files to decode.
    files: Vec<PathBuf>,

    /// Camera make, as it would appear in the file's maker note.
    #[arg(long)]
    make: String,

    /// Camera model, as it would appear in the file's maker note.
    #[arg(long)]
    model: String,

    /// The sensor's raw column count, used as the registry lookup key
    /// since this driver does not parse TIFF/CIFF container tags.
    #[arg(long)]
    raw_width: u32,

    /// Output pixel format.
    #[arg(long, value_enum, default_value_t = OutputFormatArg::Ppm24)]
    format: OutputFormatArg,

    /// Demosaicing algorithm.
    #[arg(long, value_enum, default_value_t = DemosaicArg::Vng)]
    demosaic: DemosaicArg,

    /// Treat the sensor as a single-channel document scan and derive
    /// white balance automatically instead of using the camera's
    /// factory multipliers.
    #[arg(long)]
    document_mode: bool,

    /// Skip applying a `.badpixels` side-channel file even if one is found.
    #[arg(long)]
    no_badpixels: bool,

    /// Output brightness multiplier (PPM24 only).
    #[arg(long, default_value_t = 1.0)]
    bright: f64,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum OutputFormatArg {
    Ppm24,
    Ppm48,
    Psd48,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum DemosaicArg {
    Bilinear,
    Vng,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let mut had_error = false;
    for path in &cli.files {
        if let Err(err) = decode_one(&cli, path) {
            error!("{}: {err:#}", path.display());
            had_error = true;
        }
    }

    if had_error {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn decode_one(cli: &Cli, path: &PathBuf) -> Result<()> {
    let mut file = File::open(path).with_context(|| format!("opening {}", path.display()))?;

    let identifier = TableIdentifier;
    let profile = identifier
        .identify(&cli.make, &cli.model, cli.raw_width)
        .with_context(|| format!("no known raw profile for {} {} ({})", cli.make, cli.model, cli.raw_width))?;

    let demosaic = match cli.demosaic {
        DemosaicArg::Bilinear => DemosaicAlgorithm::Bilinear,
        DemosaicArg::Vng => DemosaicAlgorithm::Vng,
    };

    let options = PipelineOptions {
        demosaic,
        document_mode: cli.document_mode,
        apply_badpixels: !cli.no_badpixels,
        badpixels_search_root: path.parent().map(|p| p.to_path_buf()),
    };

    let aux = DecodeAuxiliary::default();

    let out_path = path.with_extension(match cli.format {
        OutputFormatArg::Ppm24 | OutputFormatArg::Ppm48 => "ppm",
        OutputFormatArg::Psd48 => "psd",
    });
    let mut out = BufWriter::new(File::create(&out_path).with_context(|| format!("creating {}", out_path.display()))?);

    let gamma_options = GammaOptions {
        bright: cli.bright,
        ..GammaOptions::default()
    };

    let sink: Box<dyn ImageSink> = match cli.format {
        OutputFormatArg::Ppm24 => Box::new(Ppm24Sink { options: gamma_options }),
        OutputFormatArg::Ppm48 => Box::new(Ppm48Sink),
        OutputFormatArg::Psd48 => Box::new(Psd48Sink),
    };

    run(&mut file, &profile, &options, &aux, &*sink, &mut out)?;
    Ok(())
}
