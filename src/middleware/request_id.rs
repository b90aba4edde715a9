//! Request correlation id middleware.
//!
//! Every request gets an `x-request-id` (generated when the caller did not
//! send one) and the same id is echoed back on the response so log lines and
//! client reports can be matched up.

use axum::http::HeaderName;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

pub fn request_id_layer() -> (SetRequestIdLayer<MakeRequestUuid>, PropagateRequestIdLayer) {
    let header = HeaderName::from_static(REQUEST_ID_HEADER);
    let set = SetRequestIdLayer::new(header.clone(), MakeRequestUuid);
    let propagate = PropagateRequestIdLayer::new(header);
    (set, propagate)
}
