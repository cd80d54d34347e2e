pub mod date;
pub mod name;

pub use date::{detect_format, normalize_date, DateFormat, FormatDetection, FormatScores};
pub use name::normalize_name;
