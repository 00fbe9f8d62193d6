pub mod guard_steps;
pub mod middleware_steps;
pub mod rate_limit_steps;
