//! The extraction pipeline: live page → [`ElementMap`].

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use perceiver_dom::{fuse_accessibility, ElementMap, ElementMapBuilder, PAGE_EXTRACT_SCRIPT};

use crate::adapter::BrowserAdapter;
use crate::error::AdapterError;

/// Extract the current page into a fresh element map.
///
/// Waits for the stability window, evaluates the extraction script
/// atomically, then enriches the result from the accessibility tree. The
/// accessibility fetch is best-effort: a driver that cannot produce an AX
/// tree still yields a usable map.
pub async fn extract_element_map(
    adapter: &dyn BrowserAdapter,
    max_elements: usize,
    stability_window: Duration,
    cancel: &CancellationToken,
) -> Result<ElementMap, AdapterError> {
    adapter.wait_stable(stability_window, cancel).await?;

    let payload = adapter.evaluate(PAGE_EXTRACT_SCRIPT, cancel).await?;
    let mut map = ElementMapBuilder::new(max_elements)
        .build_from_json(&payload)
        .map_err(|err| AdapterError::ExtractionFailed(err.to_string()))?;

    match adapter.accessibility_tree(cancel).await {
        Ok(ax_raw) => {
            let enriched = fuse_accessibility(&mut map, &ax_raw);
            debug!(
                elements = map.len(),
                enriched,
                url = %map.url,
                "extracted element map"
            );
        }
        Err(err) if err.is_recoverable() => {
            warn!(error = %err, "accessibility tree unavailable; using DOM-only map");
        }
        Err(err) => return Err(err),
    }

    Ok(map)
}
