pub mod daily_log;
pub mod squad;
pub mod user;

pub use daily_log::DailyLog;
pub use squad::{GoalTemplate, Squad, SquadActivity, SquadMember};
pub use user::User;
