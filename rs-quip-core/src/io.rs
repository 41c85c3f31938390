use std::path::{Path, PathBuf};
use std::{env, fs, io};

use crate::error::{QuipError, Result};

/// Reads a whole UTF-8 text file (corpus, lexicon, config).
pub fn read_text<P: AsRef<Path>>(filename: P) -> Result<String> {
	let path = filename.as_ref();
	fs::read_to_string(path).map_err(|e| QuipError::io(e, Some(path.to_path_buf())))
}

/// Builds an output path based on an input path and a new extension.
///
/// Example:
/// `data/emerson.txt` + `"bin"` → `data/emerson.bin`
pub fn build_output_path<P: AsRef<Path>>(input_path: P, output_extension: &str) -> Result<PathBuf> {
	let input_path = input_path.as_ref();

	let parent = input_path.parent().unwrap_or_else(|| Path::new("."));
	let file_stem = input_path.file_stem().ok_or_else(|| {
		QuipError::io(
			io::Error::new(io::ErrorKind::InvalidInput, "Input path has no filename"),
			Some(input_path.to_path_buf()),
		)
	})?;

	let mut output = PathBuf::from(parent);
	output.push(file_stem);
	output.set_extension(output_extension);

	Ok(output)
}

/// Extracts the base filename without extension.
///
/// Examples:
/// - `"./data/emerson.txt"` → `"emerson"`
/// - `"emerson.txt"` → `"emerson"`
pub fn get_filename<P: AsRef<Path>>(input_path: P) -> Option<String> {
	input_path
		.as_ref()
		.file_stem()
		.map(|stem| stem.to_string_lossy().to_string())
}

/// Normalize a folder path.
///
/// - `"."` or `"./"` resolves to the current working directory
/// - Other paths are returned as-is (not canonicalized)
pub fn normalize_folder(input: &str) -> PathBuf {
	if input == "." || input == "./" {
		env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
	} else {
		PathBuf::from(input)
	}
}

/// Lists all files with a given extension in a directory, sorted.
///
/// Returns file names only (no paths).
pub fn list_files<P: AsRef<Path>>(dir: P, extension: &str) -> Result<Vec<String>> {
	let dir = dir.as_ref();
	let entries = fs::read_dir(dir).map_err(|e| QuipError::io(e, Some(dir.to_path_buf())))?;

	let mut files = Vec::new();
	for entry in entries {
		let path = entry.map_err(|e| QuipError::io(e, Some(dir.to_path_buf())))?.path();
		if path.is_file() && path.extension() == Some(std::ffi::OsStr::new(extension)) {
			if let Some(name) = path.file_name() {
				files.push(name.to_string_lossy().to_string());
			}
		}
	}
	files.sort();

	Ok(files)
}
