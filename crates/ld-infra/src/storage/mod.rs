mod file;
mod memory;

pub use file::FileDurableStorage;
pub use memory::InMemoryDurableStorage;
