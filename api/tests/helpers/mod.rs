pub mod app;

pub use app::{TestApp, body_json, get_request, json_request, make_test_app};
