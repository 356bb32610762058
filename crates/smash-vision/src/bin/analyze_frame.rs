//! CLI tool to run a single saved frame through percent detection and digit reading.
//! Usage: cargo run -p smash-vision --features cli --bin analyze_frame -- <frame.png> <templates_dir> [game] [output_dir]

use anyhow::Context;
use smash_data::{HudLayout, TemplateDir};
use smash_vision::{DigitPlace, DigitTemplates, LocatorConfig, PercentLocator, Player};
use std::path::PathBuf;
use std::sync::Arc;

fn main() -> anyhow::Result<()> {
    // Initialize tracing for debug output
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        eprintln!(
            "Usage: {} <frame.png> <templates_dir> [game] [output_dir]",
            args[0]
        );
        std::process::exit(1);
    }

    let input_path = PathBuf::from(&args[1]);
    let templates = TemplateDir::new(
        &PathBuf::from(&args[2]),
        args.get(3).map(String::as_str).unwrap_or(TemplateDir::DEFAULT_GAME),
    );
    let output_dir = args.get(4).map(PathBuf::from);

    println!("Loading image: {}", input_path.display());
    let img = image::open(&input_path)
        .with_context(|| format!("Failed to open {}", input_path.display()))?
        .to_rgb8();
    let (w, h) = img.dimensions();
    println!("Image size: {}x{}", w, h);

    let locator = PercentLocator::load(&templates, h, LocatorConfig::default())?;
    let digits = Arc::new(DigitTemplates::load(&templates, h)?);
    let hud = HudLayout::default();

    println!("\n=== Percent Glyphs ===");
    let points = locator.find_percents(&img)?;
    println!("Found {} player(s)", points.len());

    if let Some(dir) = &output_dir {
        std::fs::create_dir_all(dir)?;
    }

    for (i, point) in points.iter().enumerate() {
        let mut player = Player::new(&img, *point, &hud, digits.clone())?;
        player.analyze();
        let layout = player.layout();
        println!(
            "  Player {}: glyph at ({}, {}), HUD ({}, {})..({}, {}), percent {:?}",
            i + 1,
            point.x,
            point.y,
            layout.basepoint.x,
            layout.basepoint.y,
            layout.endpoint.x,
            layout.endpoint.y,
            player.stats().percent,
        );

        if let Some(dir) = &output_dir {
            let _ = player.frame().save(dir.join(format!("player_{}_hud.png", i + 1)));
            for place in [DigitPlace::Hundreds, DigitPlace::Tens, DigitPlace::Ones] {
                let crop = player.digit_frame(place);
                if crop.width() > 0 && crop.height() > 0 {
                    let _ = crop.save(dir.join(format!("player_{}_{}.png", i + 1, place.label())));
                }
            }
        }
    }

    if let Some(dir) = &output_dir {
        println!("\nDebug images saved to: {}", dir.display());
    }
    Ok(())
}
