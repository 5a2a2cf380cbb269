pub mod binary_grid;
pub mod line_reader;

pub use binary_grid::{BinaryGridCache, ByteOrder, GridReadError, GridValues, decode_grid};
pub use line_reader::{LineReader, Record, read_source_text};
