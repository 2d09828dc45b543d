use std::sync::Arc;

use infrastructure::EventBus;
use occupancy_automation::adapter::{LoggingActuator, SimulatedSignalSource};
use occupancy_automation::automation::{AutomationRunner, Installation};
use occupancy_automation::event::{
    BroadcastEventSink, EventRecord, FanOutEventSink, JsonLinesEventSink, MemoryEventSink, TracingEventSink,
};
use occupancy_automation::settings::Settings;
use tokio_util::sync::CancellationToken;

#[tokio::main(flavor = "multi_thread")]
pub async fn main() {
    let settings = Settings::new().expect("Error reading configuration");
    settings.monitoring.init().expect("Error initializing monitoring");

    let config = settings.control_config().expect("Invalid control configuration");
    let rooms = settings
        .rooms(config.history_capacity)
        .expect("Invalid room configuration");

    let recent_events = Arc::new(MemoryEventSink::new(settings.event_log.recent_events));
    let mut sink = FanOutEventSink::new().with(recent_events.clone());

    if let Some(path) = &settings.event_log.path {
        tracing::info!("Appending events to {}", path.display());
        sink = sink.with(JsonLinesEventSink::new(path));
    }

    let console = if settings.event_log.console {
        let bus = EventBus::<EventRecord>::new(64);
        let listener = bus.subscribe();
        sink = sink.with(BroadcastEventSink::new(bus.emitter()));
        Some(tokio::spawn(print_events(listener)))
    } else {
        sink = sink.with(TracingEventSink);
        None
    };

    let mut installation =
        Installation::new(config, LoggingActuator, sink).expect("Error creating installation");

    for (index, (room, automated)) in rooms.into_iter().enumerate() {
        let source = SimulatedSignalSource::new(settings.simulation.seed.map(|seed| seed.wrapping_add(index as u64)));
        installation
            .add_room(room, source, automated)
            .expect("Error registering room");
    }

    let stop = CancellationToken::new();
    tokio::spawn({
        let stop = stop.clone();
        async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Error waiting for shutdown signal: {:?}", e);
            }
            tracing::info!("Shutdown requested");
            stop.cancel();
        }
    });

    tracing::info!("Starting main loop");
    let installation = AutomationRunner::new(installation).run(stop).await;

    let report = installation.report();
    let stats = installation.stats().clone();
    drop(installation);

    //listener ends once the emitter inside the installation is gone
    if let Some(console) = console {
        if let Err(e) = console.await {
            tracing::error!("Error draining console events: {:?}", e);
        }
    }

    match serde_json::to_string_pretty(&report) {
        Ok(report) => println!("{report}"),
        Err(e) => tracing::error!("Error serializing energy report: {:?}", e),
    }

    for record in recent_events.recent(10) {
        tracing::debug!("{}", record);
    }
    tracing::info!(?stats, "Session finished");
}

async fn print_events(mut listener: infrastructure::EventListener<EventRecord>) {
    while let Some(record) = listener.recv().await {
        println!("{record}");
    }
}
