pub mod cloudinary;
pub mod email_service;
pub mod paystack_service;
