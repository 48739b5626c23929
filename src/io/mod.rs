pub mod console;
pub mod disk;
pub mod loader;

pub use console::Console;
pub use disk::{Disk, ReadTokenRequest};
pub use loader::{Code, CodeLoader, FileCodeLoader, Instruction, LoadError, Operand};
