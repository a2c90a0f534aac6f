pub mod issue;
pub mod project;

pub use issue::Entity as Issue;
pub use project::Entity as Project;

use chrono::{DateTime, Utc};

/// Next `updated_at` value. Never earlier than the previous one, even if the
/// wall clock steps backwards.
pub fn next_updated_at(previous: DateTime<Utc>) -> DateTime<Utc> {
    Utc::now().max(previous)
}
