//! One module per subcommand.

pub mod completions;
pub mod map_labels;
pub mod preprocess;
pub mod vocab;
pub mod wmap;

use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;

/// Open the output target: a file path, or stdout for `-`.
pub fn open_output(target: &str) -> Result<Box<dyn Write>> {
    if target == "-" {
        Ok(Box::new(std::io::stdout().lock()))
    } else {
        let file = std::fs::File::create(target)
            .with_context(|| format!("create output file {target}"))?;
        Ok(Box::new(std::io::BufWriter::new(file)))
    }
}

/// Read a whole input file as UTF-8 text.
pub fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("read input file {}", path.display()))
}
