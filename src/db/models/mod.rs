mod appointment;
mod blocked_time;
mod business_hours;

pub use appointment::*;
pub use blocked_time::*;
pub use business_hours::*;
