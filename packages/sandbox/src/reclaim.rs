// ABOUTME: Teardown of images and containers created by a sandbox run
// ABOUTME: Best-effort removal with warnings, plus a drop guard for cancelled runs

use crate::runtime::{ContainerRuntime, LabelledResources};
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

/// Grace period given to the app before the daemon kills it
pub const STOP_GRACE_SECS: u64 = 1;

/// Owns the handles created during one run until they are reclaimed.
///
/// Call [`ReclaimGuard::reclaim`] on every exit path. If the guard is dropped
/// with handles still tracked (the run future was cancelled), removal is
/// spawned on the current Tokio runtime.
pub struct ReclaimGuard {
    runtime: Arc<dyn ContainerRuntime>,
    container: Option<String>,
    image: Option<String>,
}

impl ReclaimGuard {
    pub fn new(runtime: Arc<dyn ContainerRuntime>) -> Self {
        Self {
            runtime,
            container: None,
            image: None,
        }
    }

    /// Track the image tag before the build starts; a partially built image
    /// may exist even when the build reports failure.
    pub fn track_image(&mut self, tag: impl Into<String>) {
        self.image = Some(tag.into());
    }

    /// Track a container by name before it is created, then by id once the
    /// daemon answers; stop and remove accept either.
    pub fn track_container(&mut self, container_id: impl Into<String>) {
        self.container = Some(container_id.into());
    }

    /// Remove everything tracked and return the warnings for the result
    pub async fn reclaim(mut self) -> Vec<String> {
        let container = self.container.take();
        let image = self.image.take();
        reclaim_resources(self.runtime.as_ref(), container, image).await
    }
}

impl Drop for ReclaimGuard {
    fn drop(&mut self) {
        let container = self.container.take();
        let image = self.image.take();
        if container.is_none() && image.is_none() {
            return;
        }

        match Handle::try_current() {
            Ok(handle) => {
                warn!(
                    "Sandbox run cancelled, scheduling cleanup (container: {:?}, image: {:?})",
                    container, image
                );
                let runtime = Arc::clone(&self.runtime);
                handle.spawn(async move {
                    reclaim_resources(runtime.as_ref(), container, image).await;
                });
            }
            Err(_) => {
                warn!(
                    "No async runtime available, leaking container {:?} and image {:?}",
                    container, image
                );
            }
        }
    }
}

/// Stop and remove the container, then remove the image. Never fails;
/// every problem becomes a warning.
pub async fn reclaim_resources(
    runtime: &dyn ContainerRuntime,
    container: Option<String>,
    image: Option<String>,
) -> Vec<String> {
    let mut warnings = Vec::new();

    if let Some(id) = container {
        if let Err(e) = runtime.stop_container(&id, STOP_GRACE_SECS).await {
            let message = format!("Failed to stop container {}: {}", id, e);
            warn!("{}", message);
            warnings.push(message);
        }
        match runtime.remove_container(&id).await {
            Ok(()) => debug!("Reclaimed container {}", id),
            Err(e) => {
                let message = format!("Failed to remove container {}: {}", id, e);
                warn!("{}", message);
                warnings.push(message);
            }
        }
    }

    if let Some(tag) = image {
        match runtime.remove_image(&tag).await {
            Ok(()) => debug!("Reclaimed image {}", tag),
            Err(e) => {
                let message = format!("Failed to remove image {}: {}", tag, e);
                warn!("{}", message);
                warnings.push(message);
            }
        }
    }

    warnings
}

/// Remove every container and image carrying `label`, e.g. leftovers from a
/// process that was killed mid-run. Returns what was found and any warnings.
pub async fn sweep_labelled(
    runtime: &dyn ContainerRuntime,
    label: &str,
) -> crate::Result<(LabelledResources, Vec<String>)> {
    let found = runtime.list_labelled(label).await?;
    info!(
        "Sweeping {} container(s) and {} image(s) labelled {}",
        found.containers.len(),
        found.images.len(),
        label
    );

    let mut warnings = Vec::new();
    for id in &found.containers {
        warnings.extend(reclaim_resources(runtime, Some(id.clone()), None).await);
    }
    for image in &found.images {
        warnings.extend(reclaim_resources(runtime, None, Some(image.clone())).await);
    }

    Ok((found, warnings))
}
