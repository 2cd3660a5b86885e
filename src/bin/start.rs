use clap::Parser;
use tracing::{error, info};

use cloudstart::compute::AwsCompute;
use cloudstart::dns::Route53Dns;
use cloudstart::{flow, initialize_tracing, public_ip, Config, StartArgs};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = StartArgs::parse();
    initialize_tracing(args.verbose);
    let _log_span =
        tracing::info_span!("cloudstart", version = env!("CARGO_PKG_VERSION")).entered();

    if args.generate_config {
        Config::generate_default_file(&args.config)?;
        return Ok(());
    }

    let mode = args.mode()?;
    let config = Config::load(&args)?;

    let sdk_config = cloudstart::aws::load_sdk_config(&config.aws).await;
    let compute = AwsCompute::new(aws_sdk_ec2::Client::new(&sdk_config));
    let dns = Route53Dns::new(aws_sdk_route53::Client::new(&sdk_config));

    let caller_ip = public_ip::lookup().await?;

    match flow::start::run(&compute, &dns, &config, &mode, caller_ip).await {
        Ok(outcome) => {
            info!(
                "✅ {} now points to {} (TTL {})",
                outcome.host, outcome.public_ip, outcome.ttl
            );
            Ok(())
        }
        Err(e) => {
            error!("Fatal: {e}");
            Err(e.into())
        }
    }
}
