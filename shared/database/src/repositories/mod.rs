//! Repository module for database CRUD operations
//!
//! Every query that touches COA data or attachments is scoped by organization.

pub mod coa;
pub mod organization;
pub mod user;
pub mod attachment;

pub use coa::CoaRepository;
pub use organization::OrganizationRepository;
pub use user::UserRepository;
pub use attachment::AttachmentRepository;
