use clap::Parser;
use tracing::{error, info};

use cloudstart::compute::AwsCompute;
use cloudstart::{flow, initialize_tracing, Config, Error, ReimageArgs};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = ReimageArgs::parse();
    initialize_tracing(args.verbose);
    let _log_span =
        tracing::info_span!("cloudstart-reimage", version = env!("CARGO_PKG_VERSION")).entered();

    if args.generate_config {
        Config::generate_default_file(&args.config)?;
        return Ok(());
    }

    let ami_name_tag = args
        .ami_name_tag
        .clone()
        .ok_or_else(|| Error::Usage("expected <ami-name-tag>".to_string()))?;
    let config = Config::load(&args)?;

    let sdk_config = cloudstart::aws::load_sdk_config(&config.aws).await;
    let compute = AwsCompute::new(aws_sdk_ec2::Client::new(&sdk_config));

    match flow::reimage::run(&compute, &config, &ami_name_tag, args.delete_old, args.terminate)
        .await
    {
        Ok(outcome) => {
            info!(
                "✅ {} created and tagged '{}' (old AMI: {})",
                outcome.new_image_name, ami_name_tag, outcome.old_image_id
            );
            Ok(())
        }
        Err(e) => {
            error!("Fatal: {e}");
            Err(e.into())
        }
    }
}
