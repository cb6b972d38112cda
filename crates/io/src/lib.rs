// File I/O: source workbooks in, export artifacts out

pub mod artifacts;
pub mod bundle;
pub mod csv;
pub mod dictionary;
pub mod workbook;
pub mod xlsx;
