pub mod group;
pub mod leaderboard;
pub mod project;
pub mod submission;
