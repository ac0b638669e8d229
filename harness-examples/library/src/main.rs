use std::time::Duration;

use anyhow::Context;
use case_harness::{
    reporters::{OutputFormat, Reporter},
    utils::writer::Writer,
    Callback, CaseOptions, Failure, Harness, HarnessConfig, Value,
};

fn register(harness: &Harness) -> anyhow::Result<()> {
    harness.setup_once(Callback::sync(|| Ok(Value::Unit)))?;

    let h = harness.clone();
    harness.group(
        "arithmetic",
        Callback::sync(move || {
            h.case(
                "adds",
                Callback::sync(|| match 2 + 2 {
                    4 => Ok(Value::Unit),
                    other => Err(Failure::raised(format!("expected 4, got {other}"))),
                }),
            )?;
            h.case_with(
                "waits for a slow answer",
                Callback::future(|| async {
                    tokio::time::sleep(Duration::from_millis(30)).await;
                    Ok(Value::Json(serde_json::json!(42)))
                }),
                CaseOptions::timeout_ms(500),
            )?;
            h.case_skip("not ready yet", Callback::noop())?;
            Ok(Value::Unit)
        }),
    )?;

    harness.case(
        "times out",
        Callback::done(|_done| {}),
    )?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let harness = Harness::new(HarnessConfig::default().with_timeout_ms(20));
    register(&harness).context("failed to register the suite")?;

    let reporter = Reporter::new(OutputFormat::Json, Writer::in_memory(), "library");
    let id = harness.add_listener(reporter.listener());

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;
    let results = runtime.block_on(harness.run()?)?;
    harness.remove_listener(id);

    let content = reporter
        .into_writer()?
        .into_string()
        .context("failed to read from writer")?;
    println!("{content}");
    println!(
        "{} passed, {} timed out",
        results.total_successes, results.total_timeouts
    );

    Ok(())
}
