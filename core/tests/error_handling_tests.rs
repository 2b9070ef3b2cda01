// tests/error_handling_tests.rs
mod common;

use common::*;
use orderflow::{ContextData, FlowError, Pipeline, PipelineControl};

#[tokio::test]
async fn required_step_without_handler_fails_the_run() {
  setup_tracing();
  let mut p = Pipeline::<Delivery, DeliveryError>::new(&[("verify", false, None), ("create_order", false, None)]);
  p.on_root("verify", journal("verify"));

  let ctx = ContextData::new(Delivery::of_kind("payment_succeeded"));
  match p.run(ctx.clone()).await {
    Err(DeliveryError::Engine(message)) => assert!(message.contains("create_order")),
    other => panic!("expected a missing-handler error, got {:?}", other),
  }
  assert_eq!(ctx.read().journal, vec!["verify"]);
}

#[tokio::test]
async fn step_local_error_converts_into_the_pipeline_error() {
  setup_tracing();
  let mut p = Pipeline::<Delivery, DeliveryError>::new(&[("verify", false, None)]);
  p.on_root("verify", |_ctx: ContextData<Delivery>| {
    Box::pin(async move { Err::<PipelineControl, _>(BadSignature("no t= component".to_string())) })
  });

  let err = p.run(ContextData::new(Delivery::default())).await.unwrap_err();

  assert_eq!(
    err,
    DeliveryError::Rejected("signature header unusable: no t= component".to_string())
  );
}

#[tokio::test]
async fn before_hook_error_prevents_the_main_handler() {
  setup_tracing();
  let mut p = Pipeline::<Delivery, DeliveryError>::new(&[("create_order", false, None)]);
  p.before_root(
    "create_order",
    fail_with("stock_check", DeliveryError::Backend("inventory timed out".to_string())),
  );
  p.on_root("create_order", journal("create_order"));

  let ctx = ContextData::new(Delivery::of_kind("payment_succeeded"));

  assert_eq!(
    p.run(ctx.clone()).await,
    Err(DeliveryError::Backend("inventory timed out".to_string()))
  );
  assert_eq!(ctx.read().journal, vec!["stock_check"]);
}

#[tokio::test]
async fn anyhow_failures_surface_as_handler_errors() {
  setup_tracing();
  let mut p = Pipeline::<Delivery, FlowError>::new(&[("create_order", false, None)]);
  p.on_root("create_order", |_ctx: ContextData<Delivery>| {
    Box::pin(async move {
      let call: anyhow::Result<PipelineControl> = Err(anyhow::anyhow!("orders endpoint unreachable"));
      call.map_err(FlowError::from)
    })
  });

  let err = p.run(ContextData::new(Delivery::default())).await.unwrap_err();

  assert!(matches!(err, FlowError::Handler { .. }));
  assert!(err.to_string().contains("orders endpoint unreachable"));
}
