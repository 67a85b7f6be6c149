pub mod applicant;
pub mod payment;
pub mod staff;
