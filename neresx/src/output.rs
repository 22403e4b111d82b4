use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use neres::Error;


/// The name of the output directory for the given input file.
///
/// This is the input's file name with an `.exe` extension (in any case) removed; any other
/// extension is kept.
pub(crate) fn output_dir_name(input_file: &Path) -> Option<OsString> {
    let file_name = Path::new(input_file.file_name()?);
    match file_name.extension() {
        Some(extension) if extension.eq_ignore_ascii_case("exe")
            => file_name.file_stem().map(|stem| stem.to_owned()),
        _ => Some(file_name.as_os_str().to_owned()),
    }
}


/// Creates the output directory for `input_file` within `output_root`.
///
/// Fails with [`Error::OutputExists`] if the directory is already present.
pub(crate) fn create_output_dir(output_root: &Path, input_file: &Path) -> Result<PathBuf, Error> {
    let name = output_dir_name(input_file)
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "input path has no file name"))?;
    let path = output_root.join(name);
    match fs::create_dir(&path) {
        Ok(()) => Ok(path),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Err(Error::OutputExists(path)),
        Err(e) => Err(e.into()),
    }
}
