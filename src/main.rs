// src/main.rs
//! intercept-child
//!
//! Runs one `fetch` with every transport bridged to the parent over
//! stdin/stdout, then reports the outcome on stderr as
//! `done:<status>:<body>` or `error:<message>`.

use anyhow::Result;
use clap::Parser;
use request_interceptor::observability::init_tracing;
use request_interceptor::{fetch, FetchRequest, InterceptorConfig, RemoteInterceptor};
use tracing::{debug, info};

#[derive(Debug, Parser)]
#[command(name = "intercept-child", version, about = "Fetch a URL with requests bridged to the parent process")]
struct Args {
    /// URL to fetch
    url: String,

    /// HTTP method
    #[arg(short = 'X', long, default_value = "GET")]
    method: String,

    /// Request body
    #[arg(short, long)]
    data: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(run(args));
    // The blocking stdin read behind the bridge cannot be cancelled
    runtime.shutdown_background();
    result
}

async fn run(args: Args) -> Result<()> {
    let config = InterceptorConfig::load()?;
    init_tracing(&config.logging)?;

    info!("intercept-child v{} fetching {}", request_interceptor::VERSION, args.url);

    let bridge = RemoteInterceptor::stdio()?;
    bridge.apply();

    let mut request = FetchRequest::parse(&args.method, &args.url)?;
    if let Some(data) = args.data {
        request = request.body(data);
    }

    match fetch(request).await {
        Ok(response) => eprintln!("done:{}:{}", response.status, response.text()),
        Err(e) => eprintln!("error:{}", e),
    }

    bridge.dispose();
    debug!("intercept-child finished");
    Ok(())
}
