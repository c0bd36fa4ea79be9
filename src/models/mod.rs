pub mod closeout;
pub mod netsuite;
pub mod reports;

pub use closeout::*;
pub use netsuite::*;
pub use reports::*;
