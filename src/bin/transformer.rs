//! Firehose transformation Lambda.

use finance_stream::telemetry;
use finance_stream::transform::{handle_transform_event, FirehoseResponse};
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use serde_json::Value;

async fn handle(event: LambdaEvent<Value>) -> Result<FirehoseResponse, Error> {
    tracing::debug!(request_id = %event.context.request_id, "transformer invoked");
    Ok(handle_transform_event(event.payload)?)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let _ = dotenvy::dotenv();
    telemetry::init_tracing();
    run(service_fn(handle)).await
}
