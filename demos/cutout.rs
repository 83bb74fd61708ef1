//! Cut a rectangle out of an image and paint part of it back.
//!
//! Usage:
//! ```sh
//! RUST_LOG=debug cargo run --example cutout -- input.jpg [output_dir]
//! ```

use std::env;
use std::path::Path;
use std::process;

use mask_cutout::{Result, Session, SessionOptions, Tool};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <input> [output_dir]", args[0]);
        process::exit(1);
    }

    let mut session = match Session::open_path(Path::new(&args[1]), SessionOptions::default()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{}", e.notice());
            process::exit(1);
        }
    };

    if let Err(e) = annotate(&mut session) {
        eprintln!("Error: {e}");
        process::exit(1);
    }

    let export = match session.export() {
        Ok(x) => x,
        Err(e) => {
            eprintln!("{}", e.notice());
            process::exit(1);
        }
    };

    let out_dir = args.get(2).map_or(".", String::as_str);
    let out_path = Path::new(out_dir).join(&export.name);
    if let Err(e) = std::fs::write(&out_path, &export.bytes) {
        eprintln!("Error: failed to write {}: {e}", out_path.display());
        process::exit(1);
    }

    println!("{} -> {}", export.caption(), out_path.display());
}

/// Remove the middle third of the preview, then restore a band across it.
fn annotate(session: &mut Session) -> Result<()> {
    let (w, h) = session.preview().dimensions();
    #[allow(clippy::cast_possible_wrap)]
    let (w, h) = (w as i32, h as i32);

    let surface = session.surface_mut();
    surface.draw_rect((w / 3, h / 3), (2 * w / 3, 2 * h / 3))?;
    surface.select_tool(Tool::Freehand);
    surface.draw_freehand(&[(w / 3, h / 2), (2 * w / 3, h / 2)])
}
