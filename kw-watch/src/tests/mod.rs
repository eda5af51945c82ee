mod supervisor_test;

use std::sync::{
    Arc,
    Mutex,
};

use kw_core::prelude::*;
use kw_testutils::*;
use rstest::*;
use tracing_test::traced_test;

use super::*;

type Recorded = Arc<Mutex<Vec<ResourceEvent>>>;

// A handler that just remembers everything it's given.
#[fixture]
fn recorder() -> (Arc<dyn EventHandler>, Recorded) {
    let events: Recorded = Arc::new(Mutex::new(vec![]));
    let sink = events.clone();
    let handler = FnHandler(move |evt: ResourceEvent| sink.lock().unwrap().push(evt));
    (Arc::new(handler), events)
}
