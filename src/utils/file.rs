use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// Reads up to `count` lines from the start of `path`, without line endings.
pub fn read_head(path: &Path, count: usize) -> io::Result<Vec<String>> {
    let file = File::open(path)?;
    BufReader::new(file).lines().take(count).collect()
}
