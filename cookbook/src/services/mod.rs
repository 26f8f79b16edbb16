pub mod recipes;
pub mod users;

pub use recipes::{InMemoryRecipeCatalog, RecipeCatalog};
pub use users::{InMemoryUserDirectory, RegistrationError, UserDirectory};
