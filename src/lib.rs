pub extern crate nalgebra as na;

pub mod error;
pub mod neuron;
pub mod plot;
pub mod source;
pub mod storage;
pub mod table;
pub mod types;
pub mod util;

pub use error::{Result, StorageError};
pub use source::StorageSource;
pub use storage::Storage;
pub use table::{read_table, Table};
