pub mod excel;

pub use excel::XlsxFileExporter;
