mod aggregation;
mod disasters;
mod goals;
mod news;
mod weather;

pub use aggregation::{tally, AggregationSystem};
pub use disasters::{DisasterKind, DisasterReport, DisasterSystem};
pub use goals::GoalSystem;
pub use news::NewsSystem;
pub use weather::WeatherSystem;
