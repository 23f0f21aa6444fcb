//! Request dispatch.
//!
//! Transport-neutral request and response types, the route list and the
//! error kinds handlers return. The HTTP transport mounts every [`Route`] on
//! an axum router, builds the [`RequestContext`] and turns the resulting
//! [`Outcome`]/[`ApiError`] into a response, so the status mapping lives in
//! exactly one place.

mod error;
mod request;
mod response;
mod router;

pub use error::{ApiError, ApiResult};
pub use request::{RequestBody, RequestContext, UploadPart};
pub use response::Outcome;
pub use router::{Handler, ID_SEGMENT, Route, RouteTable};
