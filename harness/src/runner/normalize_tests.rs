use super::*;
use futures::FutureExt;
use pretty_assertions::assert_eq;
use std::cell::Cell;

#[tokio::test]
async fn sync_value_is_a_success() {
    let settled = normalize(&Callback::sync(|| Ok(Value::Json(serde_json::json!(3))))).await;
    assert_eq!(settled, Ok(Value::Json(serde_json::json!(3))));
}

#[tokio::test]
async fn sync_error_value_is_still_a_success() {
    let callback = Callback::sync(|| Ok(Value::Error(Failure::raised("returned, not raised"))));
    let settled = normalize(&callback).await;
    assert_eq!(
        settled,
        Ok(Value::Error(Failure::raised("returned, not raised")))
    );
}

#[tokio::test]
async fn sync_err_fails() {
    let settled = normalize(&Callback::sync(|| Err(Failure::raised("boom")))).await;
    assert_eq!(settled, Err(Failure::Raised(String::from("boom"))));
}

#[tokio::test]
async fn sync_panic_fails() {
    let settled = normalize(&Callback::sync(|| panic!("assertion went wrong"))).await;
    assert_eq!(
        settled,
        Err(Failure::Panicked(String::from("assertion went wrong")))
    );
}

#[test]
fn sync_body_runs_when_normalized() {
    let calls = Rc::new(Cell::new(0));
    let counter = calls.clone();
    let callback = Callback::sync(move || {
        counter.set(counter.get() + 1);
        Ok(Value::Unit)
    });

    let deferred = normalize(&callback);
    assert_eq!(calls.get(), 1);
    assert_eq!(deferred.now_or_never(), Some(Ok(Value::Unit)));
}

#[tokio::test]
async fn future_outcome_is_adopted() {
    let ok = Callback::future(|| async { Ok(Value::Unit) });
    assert_eq!(normalize(&ok).await, Ok(Value::Unit));

    let failed = Callback::future(|| async {
        tokio::task::yield_now().await;
        Err(Failure::raised("later"))
    });
    assert_eq!(normalize(&failed).await, Err(Failure::raised("later")));
}

#[tokio::test]
async fn future_panic_while_polling_fails() {
    let callback = Callback::future(|| async {
        tokio::task::yield_now().await;
        if true {
            panic!("inside the future");
        }
        Ok(Value::Unit)
    });
    assert_eq!(
        normalize(&callback).await,
        Err(Failure::Panicked(String::from("inside the future")))
    );
}

#[tokio::test]
async fn done_with_value_succeeds() {
    let callback = Callback::done(|done| done.signal(Value::Json(serde_json::json!("v"))));
    assert_eq!(
        normalize(&callback).await,
        Ok(Value::Json(serde_json::json!("v")))
    );

    let callback = Callback::done(|done| done.ok());
    assert_eq!(normalize(&callback).await, Ok(Value::Unit));
}

#[tokio::test]
async fn done_with_error_value_fails() {
    let callback = Callback::done(|done| done.signal(Value::Error(Failure::raised("signalled"))));
    assert_eq!(normalize(&callback).await, Err(Failure::raised("signalled")));

    let callback = Callback::done(|done| done.fail(Failure::raised("via fail")));
    assert_eq!(normalize(&callback).await, Err(Failure::raised("via fail")));
}

#[tokio::test]
async fn done_can_be_signalled_later() {
    let callback = Callback::done(|done| {
        tokio::task::spawn_local(async move {
            tokio::task::yield_now().await;
            done.ok();
        });
    });
    let local = tokio::task::LocalSet::new();
    let settled = local.run_until(async { normalize(&callback).await }).await;
    assert_eq!(settled, Ok(Value::Unit));
}

#[test]
fn dropped_done_never_settles() {
    let callback = Callback::done(|done| drop(done));
    assert_eq!(normalize(&callback).now_or_never(), None);
}

#[test]
fn callbacks_describe_their_convention() {
    assert_eq!(format!("{:?}", Callback::noop()), "Callback::Sync");
    assert_eq!(
        format!("{:?}", Callback::future(|| async { Ok(Value::Unit) })),
        "Callback::Future"
    );
    assert_eq!(format!("{:?}", Callback::done(|d| d.ok())), "Callback::Done");
}
