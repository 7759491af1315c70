// AWS Lambda binary entry point
//
// The lambda_runtime crate drives the tokio runtime.

#[tokio::main]
async fn main() -> Result<(), lambda_runtime::Error> {
    evetl_lambda::run().await
}
