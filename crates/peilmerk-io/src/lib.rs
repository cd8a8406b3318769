//! File I/O, validation, and serialization for the peilmerk pipeline.

mod dates;
mod domain;
mod error;
mod reader;
mod reference;
mod writer;

pub use dates::{date_from_days, days_since_epoch, parse_date, parse_days, year_of};
pub use domain::{HeightDataset, RunName};
pub use error::IoError;
pub use reader::HeightReader;
pub use reference::ReferenceShifts;
pub use writer::ResultWriter;
