pub mod classifications;
pub mod conversation_messages;
pub mod conversations;
pub mod projects;
pub mod topics;
