/// Locks a `Mutex`, treating a poisoned lock as a bug.
#[macro_export]
macro_rules! unlock {
    ($e: expr) => {{
        $e.lock().unwrap()
    }};
}
