pub use group::Group;
pub use leaderboard::LeaderboardEntry;
pub use profile::{Profile, Role};
pub use project::{Project, Task, progress_percent};
pub use submission::{ContentType, Submission, SubmissionStatus};

mod group;
mod leaderboard;
mod profile;
mod project;
mod submission;
