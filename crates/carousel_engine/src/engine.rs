use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use carousel_core::{HarvestPlan, IdentifierResolver};
use carousel_logging::carousel_error;
use rand::rngs::StdRng;

use crate::fetch::ChannelProgressSink;
use crate::harvest::Harvester;
use crate::sink::ResultSink;
use crate::EngineEvent;

enum EngineCommand {
    Rebuild { plan: HarvestPlan },
}

/// Runs harvests on a dedicated worker thread. Rebuild requests queue up and
/// are served one at a time; each produces a `HarvestCompleted` event.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
}

impl EngineHandle {
    pub fn new(
        harvester: Harvester,
        identifiers: Arc<dyn IdentifierResolver>,
        mut sink: Box<dyn ResultSink>,
        mut rng: StdRng,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();

        thread::spawn(move || {
            let runtime = match tokio::runtime::Builder::new_multi_thread()
                .worker_threads(1)
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(err) => {
                    carousel_error!("Failed to start harvest runtime: {err}");
                    return;
                }
            };
            let progress = ChannelProgressSink::new(event_tx.clone());
            while let Ok(command) = cmd_rx.recv() {
                match command {
                    EngineCommand::Rebuild { plan } => {
                        let result = runtime.block_on(harvester.run(
                            &plan,
                            identifiers.as_ref(),
                            sink.as_mut(),
                            &progress,
                            &mut rng,
                        ));
                        if let Err(err) = &result {
                            carousel_error!("Harvest failed: {err}");
                        }
                        let _ = event_tx.send(EngineEvent::HarvestCompleted(result));
                    }
                }
            }
        });

        Self { cmd_tx, event_rx }
    }

    pub fn rebuild(&self, plan: HarvestPlan) {
        let _ = self.cmd_tx.send(EngineCommand::Rebuild { plan });
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Blocks for the next event; `None` once the worker has stopped.
    pub fn recv(&self) -> Option<EngineEvent> {
        self.event_rx.recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }
}
