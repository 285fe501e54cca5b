use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use graphcut::{
    io, BoundaryTerm, Neighborhood, Pixel, PixelGrid, RegionalModel, SegmentationConfig,
    SegmentationSession,
};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input image (converted to 8-bit grayscale)
    image: PathBuf,

    /// Object seed rectangle as x,y,width,height (repeatable)
    #[arg(short, long, value_parser = parse_rect, required = true)]
    object: Vec<Rect>,

    /// Background seed rectangle as x,y,width,height (repeatable)
    #[arg(short, long, value_parser = parse_rect, required = true)]
    background: Vec<Rect>,

    /// Weight of the regional term
    #[arg(long, default_value_t = 2.0)]
    lambda: f64,

    /// Intensity bandwidth of the boundary term
    #[arg(long, default_value_t = 30.0)]
    sigma: f64,

    /// Pixel connectivity
    #[arg(long, value_enum, default_value_t = Connectivity::Eight)]
    neighborhood: Connectivity,

    /// Regional intensity model
    #[arg(long, value_enum, default_value_t = Regional::Gaussian)]
    regional: Regional,

    /// Ignore intensity in the boundary term (distance-only weights)
    #[arg(long)]
    distance_only: bool,

    /// Write the binary object mask here
    #[arg(long)]
    mask: Option<PathBuf>,

    /// Write a tinted label overlay here
    #[arg(long)]
    overlay: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Rect {
    x: usize,
    y: usize,
    width: usize,
    height: usize,
}

impl Rect {
    fn pixels(&self) -> impl Iterator<Item = Pixel> + '_ {
        (self.y..self.y + self.height)
            .flat_map(move |y| (self.x..self.x + self.width).map(move |x| Pixel::new(x, y)))
    }
}

fn parse_rect(s: &str) -> Result<Rect, String> {
    let parts: Vec<usize> = s
        .split(',')
        .map(|v| v.trim().parse::<usize>())
        .collect::<Result<_, _>>()
        .map_err(|e| format!("invalid rectangle '{s}': {e}"))?;

    match parts[..] {
        [x, y, width, height] if width > 0 && height > 0 => Ok(Rect {
            x,
            y,
            width,
            height,
        }),
        _ => Err(format!(
            "invalid rectangle '{s}': expected x,y,width,height with non-zero size"
        )),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Connectivity {
    Four,
    Eight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Regional {
    Gaussian,
    Histogram,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    let config = SegmentationConfig {
        lambda: args.lambda,
        sigma: args.sigma,
        neighborhood: match args.neighborhood {
            Connectivity::Four => Neighborhood::Four,
            Connectivity::Eight => Neighborhood::Eight,
        },
        boundary_term: if args.distance_only {
            BoundaryTerm::DistanceOnly
        } else {
            BoundaryTerm::IntensityContrast
        },
        regional_model: match args.regional {
            Regional::Gaussian => RegionalModel::Gaussian,
            Regional::Histogram => RegionalModel::Histogram,
        },
    };

    let grid = io::load_grid(&args.image)?;
    tracing::info!("Grid: {}x{}", grid.width(), grid.height());

    let object = collect_seeds(&grid, &args.object).context("Invalid object seeds")?;
    let background = collect_seeds(&grid, &args.background).context("Invalid background seeds")?;
    tracing::info!(
        "Seeds: {} object, {} background",
        object.len(),
        background.len()
    );

    let init_start = Instant::now();
    let mut session = SegmentationSession::initialize(grid, config)
        .context("Failed to initialize segmentation session")?;
    tracing::info!(
        "Initialized in {:.1}ms (K={:.3})",
        init_start.elapsed().as_secs_f64() * 1000.0,
        session.k_factor()
    );

    let segment_start = Instant::now();
    let labeling = session
        .segment(&object, &background)
        .context("Segmentation failed")?
        .clone();
    let total = labeling.width() * labeling.height();
    let object_count = labeling.count(graphcut::Label::Object);
    tracing::info!(
        "Segmented in {:.1}ms: {} of {} pixels object ({:.1}%), cut={:.4}",
        segment_start.elapsed().as_secs_f64() * 1000.0,
        object_count,
        total,
        100.0 * object_count as f64 / total as f64,
        labeling.cut_value()
    );

    if let Some(path) = &args.mask {
        io::labeling_to_mask(&labeling)
            .save(path)
            .with_context(|| format!("Failed to write mask to {}", path.display()))?;
        tracing::info!("Mask written to {}", path.display());
    }

    if let Some(path) = &args.overlay {
        io::render_overlay(session.grid(), &labeling, &object, &background)
            .save(path)
            .with_context(|| format!("Failed to write overlay to {}", path.display()))?;
        tracing::info!("Overlay written to {}", path.display());
    }

    Ok(())
}

/// Expand rectangles into pixels, rejecting any that leave the grid
fn collect_seeds(grid: &PixelGrid, rects: &[Rect]) -> Result<Vec<Pixel>> {
    let fits = |start: usize, len: usize, limit: usize| {
        start.checked_add(len).is_some_and(|end| end <= limit)
    };

    let mut pixels = Vec::new();
    for rect in rects {
        if !fits(rect.x, rect.width, grid.width()) || !fits(rect.y, rect.height, grid.height()) {
            bail!(
                "rectangle {},{},{},{} exceeds the {}x{} image",
                rect.x,
                rect.y,
                rect.width,
                rect.height,
                grid.width(),
                grid.height()
            );
        }
        pixels.extend(rect.pixels());
    }
    Ok(pixels)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rectangles() {
        assert_eq!(
            parse_rect("50, 50,5,5"),
            Ok(Rect {
                x: 50,
                y: 50,
                width: 5,
                height: 5
            })
        );
        assert!(parse_rect("1,2,3").is_err());
        assert!(parse_rect("1,2,0,4").is_err());
        assert!(parse_rect("a,2,3,4").is_err());
    }

    #[test]
    fn rectangles_expand_inside_grid_only() {
        let grid = PixelGrid::new(4, 4, vec![0; 16]).expect("valid grid");
        let rect = parse_rect("1,1,2,2").expect("valid");
        let seeds = collect_seeds(&grid, &[rect]).expect("inside");
        assert_eq!(seeds.len(), 4);
        assert!(seeds.contains(&Pixel::new(2, 2)));

        let outside = parse_rect("3,3,2,1").expect("valid");
        assert!(collect_seeds(&grid, &[outside]).is_err());
    }

    #[test]
    fn huge_rectangles_are_rejected_without_overflow() {
        let grid = PixelGrid::new(4, 4, vec![0; 16]).expect("valid grid");
        let max = usize::MAX;
        for arg in [format!("{max},0,1,1"), format!("1,1,{max},1"), format!("0,2,1,{max}")] {
            let rect = parse_rect(&arg).expect("parses");
            assert!(collect_seeds(&grid, &[rect]).is_err(), "{arg} accepted");
        }
    }
}
