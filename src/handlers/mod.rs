pub(crate) mod admin_handlers;
pub(crate) mod applicant_handlers;
pub(crate) mod auth;
pub(crate) mod paystack_handlers;
pub(crate) mod upload_handlers;
