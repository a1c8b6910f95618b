pub mod history;
pub mod topic;
pub mod subscriber;

pub use history::History;
pub use topic::Topic;
pub use subscriber::Subscriber;

//outbound channel names, kept identical to the motor controller's subscriptions
pub const ACTUATORS_TOPIC: &str = "cmd_actuators";
pub const DRIVE_TOPIC: &str = "drive_power";

//how many past commands each outbound topic retains
pub const DEFAULT_DEPTH: usize = 10;

/// Marker for anything that can travel over a topic
pub trait Message: Clone + Send + 'static{}

impl<T: Clone + Send + 'static> Message for T{}
