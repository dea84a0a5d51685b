pub mod challenge;
pub mod driver;
pub mod options;
pub mod page;
