use tracing::info;

use crate::config::AutomationConfig;
use crate::scheduler::{Repeat, Requests, Scheduler, Task, TaskId};
use crate::state::DeviceState;
use crate::sync::SyncService;

/// Grace period between a successful connect and the first shadow report,
/// so the session settles before we publish into it.
const CONNECT_PUBLISH_GRACE_MS: u64 = 500;

/// Everything the task bodies operate on. Each body borrows exactly the
/// fields it needs; there is no ambient global state.
pub struct App {
    pub state: DeviceState,
    pub sync: SyncService,
}

#[derive(Debug, Clone, Copy)]
pub struct Tasks {
    pub shadow_publish: TaskId,
    pub telemetry_publish: TaskId,
    pub pump_dose: TaskId,
    pub service_loop: TaskId,
    pub reconnect: TaskId,
    pub telemetry_timer: TaskId,
    pub moisture_rule: TaskId,
    pub light_rule: TaskId,
}

/// Build the fixed task set. Registration order is dispatch order; the two
/// publish one-shots come first so a re-arm from any rule lands on the next
/// scheduler pass.
pub fn build(config: &AutomationConfig) -> (Scheduler<App>, Tasks) {
    let mut scheduler = Scheduler::new();

    let shadow_publish = scheduler.add(
        Task::new(0, Repeat::Once, |app: &mut App, _: &mut Requests| {
            let App { state, sync } = app;
            sync.publish_shadow_update(state);
        })
        .with_enable_gate(|app: &mut App, _: &mut Requests| app.sync.connected()),
    );

    let telemetry_publish = scheduler.add(
        Task::new(0, Repeat::Once, |app: &mut App, _: &mut Requests| {
            let App { state, sync } = app;
            sync.publish_sensor_measurements(state);
        })
        .with_enable_gate(|app: &mut App, _: &mut Requests| app.sync.connected()),
    );

    // The interval is the watering dose: pump on when the task arms, pump
    // off when the single iteration expires. The disable hook is the only
    // place the pump is guaranteed to be shut off again.
    let pump_dose = scheduler.add(
        Task::new(config.pump_dose_ms, Repeat::Once, |_: &mut App, _| {})
            .with_enable_gate(move |app: &mut App, requests: &mut Requests| {
                info!("watering dose started");
                app.state.write_pump(true);
                requests.restart(shadow_publish);
                true
            })
            .with_disable_hook(move |app: &mut App, requests: &mut Requests| {
                info!("watering dose finished");
                app.state.write_pump(false);
                requests.restart(shadow_publish);
            }),
    );

    let service_loop = scheduler.add(Task::new(
        0,
        Repeat::Forever,
        move |app: &mut App, requests: &mut Requests| {
            let App { state, sync } = app;
            if sync.connected() && sync.service(state) {
                requests.restart(shadow_publish);
            }
        },
    ));

    let reconnect = scheduler.add(Task::new(
        config.reconnect_interval_ms,
        Repeat::Forever,
        move |app: &mut App, requests: &mut Requests| {
            if !app.sync.connected() && app.sync.connect() {
                requests.restart_delayed(shadow_publish, CONNECT_PUBLISH_GRACE_MS);
            }
        },
    ));

    let telemetry_timer = scheduler.add(Task::new(
        config.telemetry_interval_ms,
        Repeat::Forever,
        move |_: &mut App, requests: &mut Requests| {
            requests.restart(telemetry_publish);
        },
    ));

    let moisture_rule = scheduler.add(Task::new(
        config.moisture_rule_interval_ms,
        Repeat::Forever,
        move |app: &mut App, requests: &mut Requests| {
            let threshold = app.state.moisture_threshold();
            // A failed read is not dry soil; only a real sample may water.
            if let Some(reading) = app.state.read_moisture() {
                if reading < threshold {
                    info!("soil moisture {reading} below threshold {threshold}");
                    requests.restart(pump_dose);
                }
            }
        },
    ));

    let light_rule = scheduler.add(Task::new(
        config.light_rule_interval_ms,
        Repeat::Forever,
        move |app: &mut App, requests: &mut Requests| {
            // Off-then-test: rewrite from a known state instead of trusting
            // the previously commanded one.
            app.state.write_lamp(false);
            let threshold = app.state.light_threshold();
            if let Some(lux) = app.state.read_light() {
                if lux < threshold {
                    app.state.write_lamp(true);
                }
            }
            requests.restart(shadow_publish);
        },
    ));

    (
        scheduler,
        Tasks {
            shadow_publish,
            telemetry_publish,
            pump_dose,
            service_loop,
            reconnect,
            telemetry_timer,
            moisture_rule,
            light_rule,
        },
    )
}

/// Drive both actuators to a known off state and arm the recurring tasks.
pub fn start(
    scheduler: &mut Scheduler<App>,
    tasks: &Tasks,
    app: &mut App,
    config: &AutomationConfig,
    now_ms: u64,
) {
    app.state.write_lamp(false);
    app.state.write_pump(false);

    scheduler.enable(tasks.service_loop, app, now_ms);
    scheduler.enable(tasks.reconnect, app, now_ms);
    scheduler.enable(tasks.telemetry_timer, app, now_ms);
    scheduler.enable(tasks.light_rule, app, now_ms);
    if config.moisture_rule_enabled {
        scheduler.enable(tasks.moisture_rule, app, now_ms);
    }
}
