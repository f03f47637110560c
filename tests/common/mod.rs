#![allow(dead_code, unused_imports)]

pub use shellrunner_test_utils::builders;
pub use shellrunner_test_utils::{collect_lines, eventually, init_tracing, with_timeout};
