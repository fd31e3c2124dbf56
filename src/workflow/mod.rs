pub mod accrual;
pub mod error;
pub mod events;
pub mod hours;
pub mod notify;
pub mod payslip;
pub mod shift;
pub mod vacation;
pub mod watchdog;
