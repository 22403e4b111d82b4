use std::fmt;
use std::io;
use std::path::PathBuf;


/// The ways in which an input file can fail to be a usable NE executable.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum InvalidFormat {
    NotMz,
    NotNe,
    AlignmentShiftTooLarge { shift_count: u16 },
    BitmapColorExponent { exponent: u16 },
}
impl fmt::Display for InvalidFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotMz
                => write!(f, "this is not a valid MZ executable"),
            Self::NotNe
                => write!(f, "this is not a valid NE executable"),
            Self::AlignmentShiftTooLarge { shift_count }
                => write!(f, "resource alignment shift count {} is too large", shift_count),
            Self::BitmapColorExponent { exponent }
                => write!(f, "bitmap color exponent {} does not fit into a bitmap file header", exponent),
        }
    }
}


#[derive(Debug)]
pub enum Error {
    FileNotFound(PathBuf),
    OpenFailure { path: PathBuf, error: io::Error },
    InvalidFormat(InvalidFormat),
    UnsupportedResourceType { tag: u16 },
    OutputExists(PathBuf),
    Io(io::Error),
}
impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FileNotFound(path)
                => write!(f, "input executable {} does not exist", path.display()),
            Self::OpenFailure { path, error }
                => write!(f, "there was a problem opening the file {}: {}", path.display(), error),
            Self::InvalidFormat(e)
                => write!(f, "{}", e),
            Self::UnsupportedResourceType { tag }
                => write!(f, "non-integer resource type {:#06X} is not supported", tag),
            Self::OutputExists(path)
                => write!(f, "output directory {} already exists", path.display()),
            Self::Io(e)
                => write!(f, "I/O error: {}", e),
        }
    }
}
impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::FileNotFound(_) => None,
            Self::OpenFailure { error, .. } => Some(error),
            Self::InvalidFormat(_) => None,
            Self::UnsupportedResourceType { .. } => None,
            Self::OutputExists(_) => None,
            Self::Io(e) => Some(e),
        }
    }
}
impl From<io::Error> for Error {
    fn from(value: io::Error) -> Self { Self::Io(value) }
}
impl From<InvalidFormat> for Error {
    fn from(value: InvalidFormat) -> Self { Self::InvalidFormat(value) }
}
