//! # imgsim CLI
//!
//! Command-line front end for the image similarity checker.
//!
//! ## Usage
//! ```bash
//! imgsim register cover.png poster.jpg --annotation "platform / title"
//! imgsim compare upload.webp --threshold 60 --top-k 10
//! ```

mod cli;

use image_similarity_checker::Result;

fn main() -> Result<()> {
    cli::run()
}
