//! Directory-backed notebook storage for TakeNote.
//! 以目錄保存 TakeNote 筆記本。

mod util;

pub mod store;

pub use store::{FileNotebook, FileStore, NOTEBOOK_FILE, NOTEBOOK_VERSION, READABLE_VERSION};
pub use util::write_atomic;
