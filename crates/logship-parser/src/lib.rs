// Raw log record parsing
// Normalizes heterogeneous source records into CanonicalMessage; malformed
// input is skipped with a reason code, never an error.

pub mod discovery;
mod error;
pub mod io;
pub mod parser;
pub mod schema;

pub use discovery::{SourceFile, discover_sources};
pub use error::{Error, Result};
pub use io::{SourceHeader, extract_source_header, read_lines_from};
pub use parser::{ParseOutcome, SkipReason, SourceParser};
