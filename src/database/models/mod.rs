pub mod project;
pub mod refresh_token;
pub mod task;
pub mod team;
pub mod user;

pub use project::{Project, ProjectListRow, ProjectStatus};
pub use refresh_token::RefreshToken;
pub use task::{Task, TaskListRow, TaskStatus};
pub use team::Team;
pub use user::{User, UserRole};
