pub mod closeout;
pub mod health;
pub mod reports;
pub mod sync;
