use std::time::Duration;

fn main() -> anyhow::Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(remindme_lib::run());
    // The stdin reader may still be parked in a blocking read.
    runtime.shutdown_timeout(Duration::from_millis(200));
    result
}
