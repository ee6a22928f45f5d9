pub mod projects;
pub mod refresh_tokens;
pub mod tasks;
pub mod teams;
pub mod users;

pub use projects::{ProjectFilters, ProjectRepository, ProjectUpdate};
pub use refresh_tokens::RefreshTokenRepository;
pub use tasks::{NewTask, TaskFilters, TaskRepository, TaskUpdate};
pub use teams::TeamRepository;
pub use users::{NewUser, UserFilters, UserRepository, UserUpdate};
