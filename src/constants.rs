// --- Constants for the Parquet container ---

pub const PARQUET_MAGIC: &[u8; 4] = b"PAR1"; // opening and closing magic
pub const MAGIC_LEN: usize = 4;
pub const FOOTER_LENGTH_SIZE: usize = 4; // 4 bytes - <footer_len: int32 LE>
pub const FOOTER_TAIL_LEN: usize = FOOTER_LENGTH_SIZE + MAGIC_LEN;

pub const PARQUET_FORMAT_VERSION: i32 = 1;
pub const DEFAULT_CREATED_BY: &str = concat!("lightstream-parquet version ", env!("CARGO_PKG_VERSION"));

pub const ROOT_SCHEMA_NAME: &str = "root";
pub const LIST_CONTAINER_NAME: &str = "list";
pub const MAP_KEY_VALUE_NAME: &str = "key_value";

pub const DEFAULT_PAGE_ROW_LIMIT: usize = 32_768;
pub const PAGE_HEADER_WINDOW: usize = 16 * 1024; // initial peek size for a page header
pub const INT96_LEN: usize = 12;
