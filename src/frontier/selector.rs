//! Back-queue selection
//!
//! Pairs the next ready host from the [`HostHeap`] with a link from its back
//! queue. A host whose queue has nothing to offer right now is evicted from
//! the heap instead of stalling the loop; a later insert for that host puts
//! it back.

use crate::frontier::back_queue::BackQueueRouter;
use crate::frontier::host_heap::HostHeap;
use crate::url::Link;

/// Returns the next link whose host is past its politeness window
///
/// # Returns
///
/// * `Some(Link)` - A link the caller now owns and may fetch
/// * `None` - The heap has no hosts left
pub async fn select_next_url<R: BackQueueRouter>(heap: &HostHeap, router: &R) -> Option<Link> {
    loop {
        let host = heap.next().await?;

        let dequeued = tokio::select! {
            biased;
            link = router.dequeue(&host) => link,
            _ = tokio::task::yield_now() => None,
        };

        match dequeued {
            Some(link) => {
                tracing::debug!("Selected {} from host {}", link, host);
                return Some(link);
            }
            None => {
                tracing::debug!("Back queue for {} is empty, evicting host", host);
                heap.remove(&host);
            }
        }
    }
}
