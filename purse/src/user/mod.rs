//! User module: user records and the creation workflow.
//!
//! Creating a user provisions its wallet in the same transaction, so a
//! committed user always owns exactly one wallet.

pub mod errors;
pub mod manager;
pub mod models;

pub use errors::{UserError, UserResult};
pub use manager::UserManager;
pub use models::{CreatedUser, NewUser, User, UserChanges, UserId};
