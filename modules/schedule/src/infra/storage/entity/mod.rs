pub mod course;
pub mod exam;
pub mod session;
pub mod user;
