use rgbaseam::{
    cost_to_image, CarveOptions, CarveRequest, ConstraintMask, ConstraintView, EnergyComputer,
    EnergyKind, FrameMask, MaskPolicy, PixelBuffer, Rebuild, SeamCarver, SeamCostMap,
};
use std::error::Error;

use clap::{value_parser, Arg, ArgAction, Command};

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let matches = Command::new("rgbaseam")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Elf M. Sternberg <elf.sternberg@gmail.com>")
        .about("Seam carving for RGBA images")
        .arg(
            Arg::new("image")
                .help("The image to carve")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("output")
                .help("Where to write the carved image")
                .short('o')
                .long("output")
                .required(true),
        )
        .arg(
            Arg::new("reduce-width")
                .help("Columns to remove")
                .short('x')
                .long("reduce-width")
                .value_parser(value_parser!(u32))
                .default_value("0"),
        )
        .arg(
            Arg::new("reduce-height")
                .help("Rows to remove")
                .short('y')
                .long("reduce-height")
                .value_parser(value_parser!(u32))
                .default_value("0"),
        )
        .arg(
            Arg::new("mask")
                .help("An image the same size as the input; fully opaque pixels are never carved")
                .short('m')
                .long("mask"),
        )
        .arg(
            Arg::new("energy")
                .help("Energy function: sobel or dual-gradient")
                .short('e')
                .long("energy")
                .default_value("sobel"),
        )
        .arg(
            Arg::new("batch")
                .help("Seams to take from each cost map")
                .short('b')
                .long("batch")
                .value_parser(value_parser!(usize))
                .default_value("1"),
        )
        .arg(
            Arg::new("dump-costs")
                .help("Also write a greyscale picture of the input's cost map")
                .long("dump-costs"),
        )
        .arg(
            Arg::new("incremental")
                .help("Recompute only the band of the cost map around the last seam")
                .long("incremental")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    let energy: EnergyKind = matches
        .get_one::<String>("energy")
        .map(String::as_str)
        .unwrap_or("sobel")
        .parse()?;
    let rebuild = if matches.get_flag("incremental") {
        Rebuild::Incremental
    } else {
        Rebuild::Full
    };
    let options = CarveOptions::default()
        .with_rebuild(rebuild)
        .with_seams_per_pass(matches.get_one::<usize>("batch").copied().unwrap_or(1));

    let image_path = matches
        .get_one::<String>("image")
        .ok_or("an input image is required")?;
    let buffer = PixelBuffer::from(image::open(image_path)?.to_rgba8());

    let mask = match matches.get_one::<String>("mask") {
        Some(path) => {
            let overlay = PixelBuffer::from(image::open(path)?.to_rgba8());
            Some(FrameMask::from(ConstraintMask::from_alpha(&overlay)))
        }
        None => None,
    };

    if let Some(path) = matches.get_one::<String>("dump-costs") {
        let constraint = mask
            .as_ref()
            .map(FrameMask::mask)
            .filter(|m| m.dimensions() == buffer.dimensions());
        let view = ConstraintView::new(constraint, MaskPolicy::Lockstep);
        let costs = SeamCostMap::build(&energy.compute(&buffer)?, &view)?;
        cost_to_image(&costs).save(path)?;
        log::info!("wrote cost map to {}", path);
    }

    let mut request = CarveRequest::new(&buffer)
        .reduce_width(matches.get_one::<u32>("reduce-width").copied().unwrap_or(0))
        .reduce_height(matches.get_one::<u32>("reduce-height").copied().unwrap_or(0));
    if let Some(mask) = &mask {
        request = request.with_mask(mask);
    }

    let outcome = SeamCarver::with_energy(energy, options).carve(request)?;
    let output = matches
        .get_one::<String>("output")
        .ok_or("an output path is required")?;
    outcome.buffer.to_rgba_image().save(output)?;
    log::info!(
        "wrote {}x{} image to {}",
        outcome.buffer.width(),
        outcome.buffer.height(),
        output
    );
    Ok(())
}
