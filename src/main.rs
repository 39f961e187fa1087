//! tiff-saver - inspect TIFF files and edit their tags in place.

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tiff_saver::config::{BlankArgs, Cli, Command, CommentArgs, InfoArgs, SetTagArgs};
use tiff_saver::{tags, PixelType, Result, SaverConfig, TagValue, TiffParser, TiffSaver, IFD};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = cli.saver_config().and_then(|config| match cli.command {
        Command::Info(args) => run_info(args),
        Command::Comment(args) => run_comment(args),
        Command::SetTag(args) => run_set_tag(args),
        Command::Blank(args) => run_blank(args, config),
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "tiff_saver=debug"
    } else {
        "tiff_saver=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

// =============================================================================
// Commands
// =============================================================================

fn run_info(args: InfoArgs) -> Result<()> {
    let parser = TiffParser::open(&args.file)?;
    let tiff = parser.read()?;
    println!("{}", tiff);
    Ok(())
}

fn run_comment(args: CommentArgs) -> Result<()> {
    let saver = TiffSaver::open(&args.file)?;
    saver.overwrite_ifd_value(args.ifd, tags::IMAGE_DESCRIPTION, TagValue::Text(args.text))?;
    info!("Updated ImageDescription of IFD {} in {}", args.ifd, args.file.display());
    Ok(())
}

fn run_set_tag(args: SetTagArgs) -> Result<()> {
    let value = args.value()?;
    let saver = TiffSaver::open(&args.file)?;
    saver.overwrite_ifd_value(args.ifd, args.tag, value)?;
    info!(
        "Updated {} ({}) of IFD {} in {}",
        tags::tag_name(args.tag),
        args.tag,
        args.ifd,
        args.file.display()
    );
    Ok(())
}

fn run_blank(args: BlankArgs, config: SaverConfig) -> Result<()> {
    let saver = TiffSaver::create_with_config(&args.file, config)?;
    let mut ifd = IFD::new();
    ifd.put_value(tags::IMAGE_WIDTH, args.width);
    ifd.put_value(tags::IMAGE_LENGTH, args.height);
    ifd.put_value(tags::COMPRESSION, TagValue::Short(args.compression));
    if let Some(tile) = args.tile {
        ifd.put_value(tags::TILE_WIDTH, tile);
        ifd.put_value(tags::TILE_LENGTH, tile);
    }

    let pixels = vec![0u8; args.width as usize * args.height as usize];
    saver.write_image(&pixels, &mut ifd, 0, PixelType::Uint8, true)?;
    info!(
        "Wrote {}x{} blank image to {}",
        args.width,
        args.height,
        args.file.display()
    );
    Ok(())
}
