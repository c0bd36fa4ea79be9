pub mod closeout_import_service;
pub mod netsuite;
pub mod reporting_service;
pub mod response_cache;
pub mod spreadsheet_parser;

pub use closeout_import_service::CloseoutImportService;
pub use reporting_service::ReportingService;
pub use response_cache::ResponseCache;
pub use spreadsheet_parser::SpreadsheetParser;
