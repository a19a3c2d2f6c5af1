pub mod memory;
pub mod workbook;

pub use memory::MemoryStorage;
pub use workbook::WorkbookStorage;
