//! Rate limiting logic and state management.

mod bucket;
mod clock;
mod limiter;
mod reclaimer;
mod registry;

pub use bucket::{BucketConfig, Decision, TokenBucket};
pub use clock::{Clock, ManualClock, MonoClock};
pub use limiter::{LimitScope, RateLimiter, GLOBAL_IDENTITY};
pub use reclaimer::Reclaimer;
pub use registry::{ClientEntry, ClientRegistry};
