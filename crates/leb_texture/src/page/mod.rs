//! Page formats and the on-disk page store.

pub mod format;
pub mod store;

pub use format::{bytes_per_page, LayerDesc, ParseFormatError, PixelFormat, PixelFormatTag};
pub use store::{PageHeader, PageSource, PageStore, HEADER_SIZE, MAGIC, MAX_FILE_LEN, MAX_LAYERS};
