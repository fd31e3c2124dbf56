pub mod attendance;
pub mod notification;
pub mod payslip;
pub mod role;
pub mod user;
pub mod vacation_request;
