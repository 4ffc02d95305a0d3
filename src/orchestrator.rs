//! Hotkey orchestration core
//!
//! A dedicated thread owns the `GlobalHotKeyManager` and therefore every
//! OS-level hotkey registration: the underlying facility scopes global
//! hotkeys to the registering thread, so all reconfiguration requests
//! from other threads are marshalled as posted control messages and
//! consumed here, never applied by direct mutation. The thread's select
//! loop interleaves control messages with hotkey-fired events in posting
//! order, so a rebind posted after a toggle is always observed before a
//! later firing could use the stale binding.

use crate::config::{HotkeyRole, Settings};
use crate::keys::HotkeyBinding;
use crate::pipeline::{self, Job};
use crate::{notification, APP_NAME};
use crossbeam_channel::{unbounded, Receiver, Sender};
use global_hotkey::hotkey::HotKey;
use global_hotkey::{GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

/// Minimum interval between two accepted trigger dispatches. Firings
/// inside the window are dropped silently.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(600);

/// Requests postable to the orchestrator thread from anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMsg {
    /// Bind or release the trigger hotkey according to current settings.
    SetTriggerRegistration(bool),
    /// Re-read settings and rebind the trigger combination.
    UpdateTriggerHotkey,
    /// Re-read settings and rebind the exit combination.
    UpdateExitHotkey,
    /// Re-read settings and rebind (or release) the case combination.
    UpdateCaseHotkey,
    /// Release everything and end the loop.
    Shutdown,
}

/// Cloneable posting side of the orchestrator's control channel.
#[derive(Clone)]
pub struct OrchestratorHandle {
    tx: Sender<ControlMsg>,
}

impl OrchestratorHandle {
    pub fn post(&self, msg: ControlMsg) {
        if self.tx.send(msg).is_err() {
            warn!("Orchestrator is gone, dropping {msg:?}");
        }
    }

    pub fn set_trigger_registration(&self, on: bool) {
        self.post(ControlMsg::SetTriggerRegistration(on));
    }

    pub fn update_binding(&self, role: HotkeyRole) {
        self.post(match role {
            HotkeyRole::Trigger => ControlMsg::UpdateTriggerHotkey,
            HotkeyRole::Exit => ControlMsg::UpdateExitHotkey,
            HotkeyRole::Case => ControlMsg::UpdateCaseHotkey,
        });
    }

    pub fn shutdown(&self) {
        self.post(ControlMsg::Shutdown);
    }
}

/// Result of one attempt to (re)bind a logical hotkey.
#[derive(Debug)]
enum RegistrationOutcome {
    Bound(HotKey),
    /// Nothing configured for this role.
    Unbound,
    /// The combination aliases another role's binding; previous
    /// registration left in place.
    Conflict,
    /// The OS refused the bind; the logical binding stays unregistered
    /// until the next successful update.
    Failed,
}

/// OS-level registrations currently held. Lives only on the loop thread.
#[derive(Default)]
struct RegistrationState {
    trigger: Option<HotKey>,
    exit: Option<HotKey>,
    case: Option<HotKey>,
}

impl RegistrationState {
    fn slot(&mut self, role: HotkeyRole) -> &mut Option<HotKey> {
        match role {
            HotkeyRole::Trigger => &mut self.trigger,
            HotkeyRole::Exit => &mut self.exit,
            HotkeyRole::Case => &mut self.case,
        }
    }

    fn release(&mut self, manager: &GlobalHotKeyManager, role: HotkeyRole) {
        if let Some(hotkey) = self.slot(role).take() {
            if let Err(e) = manager.unregister(hotkey) {
                warn!("Failed to unregister {} hotkey: {e}", role.label());
            } else {
                debug!("{} hotkey unregistered", role.label());
            }
        }
    }

    fn release_all(&mut self, manager: &GlobalHotKeyManager) {
        for role in [HotkeyRole::Trigger, HotkeyRole::Exit, HotkeyRole::Case] {
            self.release(manager, role);
        }
    }
}

/// Debounce plus non-blocking mutual exclusion for worker dispatch.
/// At most one worker runs at a time; firings during the debounce
/// window or while a worker is in flight are dropped, never queued.
struct DispatchGate {
    debounce: Duration,
    last_accepted: Option<Instant>,
    busy: Arc<AtomicBool>,
}

/// Releases the in-flight flag when the worker finishes, on any path.
struct WorkerGuard {
    busy: Arc<AtomicBool>,
}

impl Drop for WorkerGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

impl DispatchGate {
    fn new(debounce: Duration) -> Self {
        DispatchGate {
            debounce,
            last_accepted: None,
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Accept a firing, returning the guard the worker must hold, or
    /// None when the firing is debounced or a worker is already active.
    fn try_accept(&mut self, now: Instant) -> Option<WorkerGuard> {
        if let Some(last) = self.last_accepted {
            if now.duration_since(last) < self.debounce {
                debug!("Trigger inside debounce window, dropped");
                return None;
            }
        }
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Worker already in flight, trigger dropped");
            return None;
        }
        self.last_accepted = Some(now);
        Some(WorkerGuard {
            busy: self.busy.clone(),
        })
    }
}

/// Spawn the orchestrator thread. `exit_tx` fires when the loop ends,
/// whether through the exit hotkey, a Shutdown message, or a startup
/// failure.
pub fn spawn(
    settings_path: Option<PathBuf>,
    exit_tx: oneshot::Sender<()>,
) -> (OrchestratorHandle, JoinHandle<()>) {
    let (tx, rx) = unbounded();
    let handle = OrchestratorHandle { tx };
    let join = std::thread::Builder::new()
        .name("keyswap-hotkeys".to_string())
        .spawn(move || run(settings_path, rx, exit_tx))
        .expect("failed to spawn hotkey thread");
    (handle, join)
}

fn run(
    settings_path: Option<PathBuf>,
    control_rx: Receiver<ControlMsg>,
    exit_tx: oneshot::Sender<()>,
) {
    let manager = match GlobalHotKeyManager::new() {
        Ok(m) => m,
        Err(e) => {
            // Unrecoverable: without the manager no hotkey can ever fire.
            error!("Failed to initialize global hotkey manager: {e}");
            notification::send_sync(
                APP_NAME,
                "Could not initialize global hotkeys. The daemon will exit.",
            );
            let _ = exit_tx.send(());
            return;
        }
    };

    let mut settings = read_settings(&settings_path).unwrap_or_default();
    let mut state = RegistrationState::default();

    // Exit is bound unconditionally and wins a hand-edited conflict, so
    // the daemon can always be stopped; trigger and case bind only while
    // enabled and refuse combinations that alias another role.
    let outcome = bind(&manager, &settings, HotkeyRole::Exit);
    apply_outcome(&mut state, HotkeyRole::Exit, outcome);
    if settings.enabled {
        let outcome = bind_over(&manager, &settings, HotkeyRole::Trigger, &mut state);
        apply_outcome(&mut state, HotkeyRole::Trigger, outcome);
        let outcome = bind_over(&manager, &settings, HotkeyRole::Case, &mut state);
        apply_outcome(&mut state, HotkeyRole::Case, outcome);
    }

    let hotkey_rx = GlobalHotKeyEvent::receiver();
    let mut gate = DispatchGate::new(DEBOUNCE_WINDOW);

    info!(
        "Hotkeys ready: translate {} ({}), exit {}",
        settings.translate_hotkey,
        if state.trigger.is_some() { "bound" } else { "not bound" },
        settings.exit_hotkey,
    );

    loop {
        crossbeam_channel::select! {
            recv(control_rx) -> msg => match msg {
                Ok(ControlMsg::SetTriggerRegistration(on)) => {
                    if let Some(latest) = read_settings(&settings_path) {
                        settings = latest;
                    }
                    if on {
                        let outcome =
                            bind_over(&manager, &settings, HotkeyRole::Trigger, &mut state);
                        apply_outcome(&mut state, HotkeyRole::Trigger, outcome);
                        let outcome =
                            bind_over(&manager, &settings, HotkeyRole::Case, &mut state);
                        apply_outcome(&mut state, HotkeyRole::Case, outcome);
                    } else {
                        state.release(&manager, HotkeyRole::Trigger);
                        state.release(&manager, HotkeyRole::Case);
                        info!("Trigger hotkey released (disabled)");
                    }
                }
                Ok(ControlMsg::UpdateTriggerHotkey) => {
                    rebind(&manager, &settings_path, &mut settings, &mut state, HotkeyRole::Trigger);
                }
                Ok(ControlMsg::UpdateExitHotkey) => {
                    rebind(&manager, &settings_path, &mut settings, &mut state, HotkeyRole::Exit);
                }
                Ok(ControlMsg::UpdateCaseHotkey) => {
                    rebind(&manager, &settings_path, &mut settings, &mut state, HotkeyRole::Case);
                }
                Ok(ControlMsg::Shutdown) | Err(_) => {
                    debug!("Orchestrator shutting down");
                    break;
                }
            },
            recv(hotkey_rx) -> event => {
                let Ok(event) = event else { break };
                if event.state != HotKeyState::Pressed {
                    continue;
                }
                if state.exit.map(|h| h.id()) == Some(event.id) {
                    info!("Exit hotkey fired, shutting down");
                    break;
                } else if state.trigger.map(|h| h.id()) == Some(event.id) {
                    dispatch(&mut gate, Job::Translate);
                } else if state.case.map(|h| h.id()) == Some(event.id) {
                    dispatch(&mut gate, Job::Case);
                } else {
                    debug!("Hotkey event {} does not match any binding", event.id);
                }
            },
        }
    }

    // Guaranteed cleanup on every path out of the loop.
    state.release_all(&manager);
    let _ = exit_tx.send(());
}

fn dispatch(gate: &mut DispatchGate, job: Job) {
    let Some(guard) = gate.try_accept(Instant::now()) else {
        return;
    };
    let spawned = std::thread::Builder::new()
        .name("keyswap-worker".to_string())
        .spawn(move || {
            let _guard = guard;
            // A failed cycle is a no-op for this firing, never a crash.
            if let Err(e) = pipeline::run(job) {
                warn!("Transform cycle failed: {e}");
            }
        });
    if let Err(e) = spawned {
        warn!("Failed to spawn worker thread: {e}");
    }
}

/// Re-read settings and rebind one role, releasing the previous
/// registration only once the new combination is known to be
/// conflict-free.
fn rebind(
    manager: &GlobalHotKeyManager,
    settings_path: &Option<PathBuf>,
    settings: &mut Settings,
    state: &mut RegistrationState,
    role: HotkeyRole,
) {
    if let Some(latest) = read_settings(settings_path) {
        *settings = latest;
    }
    // Trigger-like bindings stay released while disabled; the next
    // SetTriggerRegistration(true) picks up the new combination.
    if role != HotkeyRole::Exit && !settings.enabled {
        debug!("{} rebind deferred: converter is disabled", role.label());
        return;
    }
    let outcome = bind_over(manager, settings, role, state);
    apply_outcome(state, role, outcome);
}

/// Bind `role` per `settings`, releasing the currently held
/// registration first (after the conflict check has passed).
fn bind_over(
    manager: &GlobalHotKeyManager,
    settings: &Settings,
    role: HotkeyRole,
    state: &mut RegistrationState,
) -> RegistrationOutcome {
    if conflicts(settings, role) {
        return RegistrationOutcome::Conflict;
    }
    state.release(manager, role);
    bind(manager, settings, role)
}

fn bind(
    manager: &GlobalHotKeyManager,
    settings: &Settings,
    role: HotkeyRole,
) -> RegistrationOutcome {
    let Some(binding) = settings.binding(role) else {
        return RegistrationOutcome::Unbound;
    };
    register(manager, binding, role)
}

/// The settings file can be edited by hand, so the conflict policy is
/// enforced again here, not only at write time.
fn conflicts(settings: &Settings, role: HotkeyRole) -> bool {
    let Some(binding) = settings.binding(role) else {
        return false;
    };
    for other in [HotkeyRole::Trigger, HotkeyRole::Exit, HotkeyRole::Case] {
        if other == role {
            continue;
        }
        if let Some(other_binding) = settings.binding(other) {
            if binding.conflicts_with(other_binding) {
                warn!(
                    "{} hotkey {} aliases the {} hotkey, refusing to bind",
                    role.label(),
                    binding,
                    other.label()
                );
                notification::send_sync(
                    APP_NAME,
                    &format!(
                        "{} is already used by the {} hotkey. The {} hotkey was not changed.",
                        binding,
                        other.label(),
                        role.label()
                    ),
                );
                return true;
            }
        }
    }
    false
}

fn register(
    manager: &GlobalHotKeyManager,
    binding: &HotkeyBinding,
    role: HotkeyRole,
) -> RegistrationOutcome {
    let hotkey = match binding.to_os_hotkey() {
        Ok(h) => h,
        Err(e) => {
            warn!("{} hotkey {binding} cannot be registered: {e}", role.label());
            return RegistrationOutcome::Failed;
        }
    };
    match manager.register(hotkey) {
        Ok(()) => {
            info!("{} hotkey bound to {binding}", role.label());
            RegistrationOutcome::Bound(hotkey)
        }
        Err(e) => {
            warn!("OS refused to bind {binding} for {}: {e}", role.label());
            notification::send_sync(
                APP_NAME,
                &format!("Could not register {binding}. It may be owned by another application."),
            );
            RegistrationOutcome::Failed
        }
    }
}

fn apply_outcome(state: &mut RegistrationState, role: HotkeyRole, outcome: RegistrationOutcome) {
    match outcome {
        RegistrationOutcome::Bound(hotkey) => *state.slot(role) = Some(hotkey),
        // Conflict keeps whatever was held before; Unbound and Failed
        // leave the role unregistered.
        RegistrationOutcome::Conflict => {}
        RegistrationOutcome::Unbound | RegistrationOutcome::Failed => {
            if state.slot(role).is_none() {
                debug!("{} hotkey remains unregistered", role.label());
            }
        }
    }
}

fn read_settings(path: &Option<PathBuf>) -> Option<Settings> {
    match Settings::load(path.as_deref()) {
        Ok(settings) => Some(settings),
        Err(e) => {
            warn!("Failed to reload settings, keeping previous bindings: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_accepts_first_firing() {
        let mut gate = DispatchGate::new(Duration::from_millis(600));
        assert!(gate.try_accept(Instant::now()).is_some());
    }

    #[test]
    fn gate_debounces_dense_firings() {
        let mut gate = DispatchGate::new(Duration::from_millis(600));
        let t0 = Instant::now();
        let guard = gate.try_accept(t0).unwrap();
        drop(guard);

        // Inside the window: dropped even though no worker is active.
        assert!(gate.try_accept(t0 + Duration::from_millis(100)).is_none());
        assert!(gate.try_accept(t0 + Duration::from_millis(599)).is_none());
        // At or past the window: accepted again.
        assert!(gate.try_accept(t0 + Duration::from_millis(600)).is_some());
    }

    #[test]
    fn gate_never_admits_a_second_worker() {
        let mut gate = DispatchGate::new(Duration::from_millis(0));
        let t0 = Instant::now();
        let guard = gate.try_accept(t0).unwrap();

        // Worker still in flight: dropped, not queued.
        assert!(gate.try_accept(t0 + Duration::from_secs(5)).is_none());

        drop(guard);
        assert!(gate.try_accept(t0 + Duration::from_secs(5)).is_some());
    }

    #[test]
    fn debounce_runs_from_last_accepted_dispatch() {
        let mut gate = DispatchGate::new(Duration::from_millis(600));
        let t0 = Instant::now();
        drop(gate.try_accept(t0));

        // Dropped firings must not extend the window.
        assert!(gate.try_accept(t0 + Duration::from_millis(300)).is_none());
        assert!(gate.try_accept(t0 + Duration::from_millis(700)).is_some());
    }
}
