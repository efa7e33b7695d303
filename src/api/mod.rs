pub(crate) mod auth;
pub(crate) mod dashboard;
pub(crate) mod errors;
pub(crate) mod handlers;
pub(crate) mod materials;
pub(crate) mod params;
pub(crate) mod proxy;
pub(crate) mod questions;
pub(crate) mod results;
pub(crate) mod review;
pub(crate) mod router;
pub(crate) mod sessions;
pub(crate) mod student_sessions;
