//! Plain-text time vector store/reload.
//!
//! One value per line in 18-digit scientific notation, so a saved vector
//! reloads bit-exactly. Loading accepts any whitespace-delimited numbers.
use crate::relaxometry::errors::{RelaxError, RelaxResult};
use std::{fs, path::Path};

/// Write `times` to `path`, one `{:.18e}` value per line.
///
/// # Errors
/// [`RelaxError::Io`] if the file cannot be written.
pub fn save_times<P: AsRef<Path>>(path: P, times: &[f64]) -> RelaxResult<()> {
    let path = path.as_ref();
    let text: String = times.iter().map(|t| format!("{t:.18e}\n")).collect();
    fs::write(path, text).map_err(|e| io_error(path, e))
}

/// Read a whitespace-delimited time vector from `path`.
///
/// # Errors
/// - [`RelaxError::Io`] if the file cannot be read.
/// - [`RelaxError::ParseTimes`] on the first token that is not a number.
pub fn load_times<P: AsRef<Path>>(path: P) -> RelaxResult<Vec<f64>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| io_error(path, e))?;
    text.split_whitespace()
        .map(|token| {
            token.parse::<f64>().map_err(|_| RelaxError::ParseTimes {
                path: path.to_path_buf(),
                token: token.to_string(),
            })
        })
        .collect()
}

fn io_error(path: &Path, err: std::io::Error) -> RelaxError {
    RelaxError::Io { path: path.to_path_buf(), text: err.to_string() }
}
