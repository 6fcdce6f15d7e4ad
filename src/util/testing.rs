//! Shared test setup: logging and sample gradebooks.

use std::env;
use std::path::{Path, PathBuf};
use std::sync::Once;

use tracing::{debug, info};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

static TEST_SETUP: Once = Once::new();

/// A small course: weighted categories, points-weighted homeworks with an
/// extra-credit item, and two students with partially filled grades.
pub const SAMPLE_GRADEBOOK: &str = "\
Student\tCourse (100%)\t__Homeworks (40%)\t____HW1 (10)\t____HW2 (10)\t____Bonus* (5)\t__Exams (60%)\t____Midterm (1/2)\t____Final (1/2)
Doe, Jane <jdoe@example.edu>\t56.00%\t80.00%\t18/20\t7\tNone\t40.00%\t80%\tNone
Roe, Rich <rroe@example.edu>\t31.00%\t77.50%\tA-\t-4\tNone\t0.00%\tNone\tNone
";

pub fn init_test_setup() {
    TEST_SETUP.call_once(|| {
        if env::var("RUST_LOG").is_err() {
            env::set_var("RUST_LOG", "gradetree=trace");
        }
        setup_test_logging();
        info!("Test Setup complete");
    });
}

fn setup_test_logging() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("gradetree=debug"));

    let subscriber = tracing_subscriber::registry().with(
        fmt::layer()
            .with_target(true)
            .with_thread_names(false)
            .with_span_events(FmtSpan::CLOSE)
            .with_test_writer()
            .with_filter(env_filter),
    );

    // Only set if we haven't already set a global subscriber
    if tracing::dispatcher::has_been_set() {
        debug!("Tracing subscriber already set");
    } else {
        subscriber.try_init().unwrap_or_else(|e| {
            eprintln!("Error: Failed to set up logging: {}", e);
        });
    }
}

/// Write `content` to `dir/name` and return the path.
pub fn write_gradebook(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).expect("write gradebook");
    path
}
