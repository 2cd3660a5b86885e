// src/flow/reimage.rs - roll an instance into a new versioned AMI

use tracing::info;

use super::exactly_one;
use crate::compute::ComputeProvider;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::poll::{poll_until, PollSpec};

#[derive(Debug)]
pub struct ReimageOutcome {
    pub new_image_id: String,
    pub new_image_name: String,
    pub old_image_id: String,
}

/// AMI names carry a version suffix, `"<tag> (<n>)"`. Anything that doesn't
/// parse counts as version 1 so the next image becomes `(2)`.
fn version_from_name(ami_name_tag: &str, image_name: Option<&str>) -> u32 {
    image_name
        .and_then(|name| name.strip_prefix(ami_name_tag))
        .and_then(|rest| rest.strip_prefix(" ("))
        .and_then(|rest| rest.strip_suffix(')'))
        .and_then(|digits| digits.parse::<u32>().ok())
        .unwrap_or(1)
}

/// Creates a new AMI from the (single) instance launched from the AMI
/// currently tagged `ami_name_tag`, then moves the Name tag over to it.
pub async fn run(
    compute: &dyn ComputeProvider,
    config: &Config,
    ami_name_tag: &str,
    delete_old: bool,
    terminate: bool,
) -> Result<ReimageOutcome> {
    info!("Getting AMI");
    let old_image = exactly_one(
        compute.images_by_name_tag(ami_name_tag).await?,
        "image",
        ami_name_tag,
    )?;

    let version = version_from_name(ami_name_tag, old_image.name.as_deref()) + 1;
    let new_image_name = format!("{ami_name_tag} ({version})");

    info!("Getting instance");
    let instance = exactly_one(
        compute.instances_by_image(&old_image.id).await?,
        "instance",
        &old_image.id,
    )?;

    info!("Creating new AMI: {new_image_name}");
    let new_image_id = compute.create_image(&instance.id, &new_image_name).await?;

    let spec = PollSpec::new(
        "new AMI to become available",
        config.poll.image_interval(),
        config.poll.max_attempts,
    );
    poll_until(
        &spec,
        || compute.image_by_id(&new_image_id),
        |image| {
            let done = image.state.is_available();
            if !done {
                info!("New AMI is currently {}", image.state);
            }
            done
        },
    )
    .await?;

    info!("Setting new AMI's Name tag");
    compute.set_name_tag(&new_image_id, ami_name_tag).await?;

    let old_name_tag = format!("{ami_name_tag} (Old)");
    info!("Setting old AMI's Name tag to: {old_name_tag}");
    compute.set_name_tag(&old_image.id, &old_name_tag).await?;

    if delete_old {
        let snapshot_id = old_image.snapshot_id.clone().ok_or(Error::MissingSnapshot {
            image_id: old_image.id.clone(),
        })?;

        info!("Deleting old AMI");
        compute.deregister_image(&old_image.id).await?;

        info!("Deleting old AMI's EBS snapshot");
        compute.delete_snapshot(&snapshot_id).await?;
    }

    if terminate {
        info!("Terminating instance");
        compute.terminate_instance(&instance.id).await?;
    }

    Ok(ReimageOutcome {
        new_image_id,
        new_image_name,
        old_image_id: old_image.id,
    })
}
