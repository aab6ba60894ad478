//! Per-contract bookkeeping the supervisor keeps alongside a spawned
//! ingester task (§4.3).

use cg_05_ingester::{ChainEventSource, HistorySource, Ingester};
use shared_types::entities::Network;
use tokio::task::JoinHandle;

pub(crate) struct ControlBlock<C: ChainEventSource, H: HistorySource> {
    pub ingester: Ingester<C, H>,
    pub handle: JoinHandle<()>,
    pub network: Network,
}
