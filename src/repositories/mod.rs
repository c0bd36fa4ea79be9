pub mod closeout_repo;
pub mod report_repo;
pub mod sales_order_repo;
pub mod work_order_repo;

pub use closeout_repo::*;
pub use report_repo::*;
pub use sales_order_repo::*;
pub use work_order_repo::*;
