use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::action::{ActionId, ActionSelection, Bindings, Controller, selection};
use crate::config::Config;
use crate::host::{Feedback, Host, HostEvent};
use crate::poller::FocusPoller;
use crate::router::{self, Dispatch};
use crate::store::{DeviceStore, FocusChange};
use crate::switcher;
use crate::worker::{Worker, WorkerCommand, WorkerEvent};

/// Connectivity of the shared worker link as seen by bound actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Unbound,
    Connecting,
    Ready,
    Disconnected,
}

/// Process-wide plugin state: one worker link, one store, every bound action.
///
/// All mutation goes through `&mut self` from a single event loop, so handlers
/// never interleave except at their own await points.
pub struct Plugin<H: Host> {
    host: H,
    worker: Worker,
    worker_path: PathBuf,
    poll_interval: Option<Duration>,
    store: DeviceStore,
    bindings: Bindings,
    link: LinkState,
    poller: Option<FocusPoller>,
    worker_rx: mpsc::UnboundedReceiver<WorkerEvent>,
    tick_tx: mpsc::UnboundedSender<()>,
    tick_rx: mpsc::UnboundedReceiver<()>,
}

impl<H: Host> Plugin<H> {
    pub fn new(config: &Config, host: H) -> Self {
        let (worker_tx, worker_rx) = mpsc::unbounded_channel();
        let (tick_tx, tick_rx) = mpsc::unbounded_channel();
        Self {
            host,
            worker: Worker::from_config(config, worker_tx),
            worker_path: config.resolved_worker_path(),
            poll_interval: config.focus_poll_interval(),
            store: DeviceStore::new(),
            bindings: Bindings::new(),
            link: LinkState::Unbound,
            poller: None,
            worker_rx,
            tick_tx,
            tick_rx,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn store(&self) -> &DeviceStore {
        &self.store
    }

    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    pub fn worker(&self) -> &Worker {
        &self.worker
    }

    pub fn worker_mut(&mut self) -> &mut Worker {
        &mut self.worker
    }

    pub fn link_state(&self) -> LinkState {
        self.link
    }

    pub fn is_polling(&self) -> bool {
        self.poller.is_some()
    }

    /// Drive the plugin until the host event stream ends or Ctrl-C
    pub async fn run(mut self, mut host_events: mpsc::UnboundedReceiver<HostEvent>) {
        loop {
            tokio::select! {
                event = host_events.recv() => match event {
                    Some(event) => self.handle_host_event(event).await,
                    None => {
                        info!("host event stream closed");
                        break;
                    }
                },
                Some(event) = self.worker_rx.recv() => self.handle_worker_event(event).await,
                Some(()) = self.tick_rx.recv() => self.on_poll_tick().await,
                _ = tokio::signal::ctrl_c() => {
                    info!("interrupted");
                    break;
                }
            }
        }

        self.shutdown().await;
    }

    /// Handle one pending worker frame, disconnect notice or poll tick.
    /// Returns false if there is nothing left to wait for.
    pub async fn step(&mut self) -> bool {
        tokio::select! {
            Some(event) = self.worker_rx.recv() => {
                self.handle_worker_event(event).await;
                true
            }
            Some(()) = self.tick_rx.recv() => {
                self.on_poll_tick().await;
                true
            }
            else => false,
        }
    }

    pub async fn handle_host_event(&mut self, event: HostEvent) {
        debug!(action = %event.context(), ?event, "host event");
        if event.is_devices_request() {
            self.send_device_options(event.context());
            return;
        }

        match event {
            HostEvent::WillAppear {
                context,
                controller,
                settings,
            } => self.on_appear(context, controller, settings).await,
            HostEvent::WillDisappear { context } => self.on_disappear(&context).await,
            HostEvent::DidReceiveSettings { context, settings } => {
                self.on_settings(&context, settings)
            }
            HostEvent::KeyDown { context } => self.on_key_down(&context).await,
            HostEvent::DialRotate { context, ticks } => self.on_dial_rotate(&context, ticks),
            HostEvent::DialDown { context } => self.apply_switch(&context).await,
            HostEvent::SendToPlugin { context, payload } => {
                debug!(action = %context, %payload, "unhandled inspector message");
            }
        }
    }

    pub async fn handle_worker_event(&mut self, event: WorkerEvent) {
        match event {
            WorkerEvent::Frame { generation, text } => {
                if !self.worker.is_current(generation) {
                    debug!(generation, "dropping frame from replaced connection");
                    return;
                }
                self.handle_worker_frame(&text).await;
            }
            WorkerEvent::Disconnected { generation } => {
                if self.worker.handle_disconnect(generation) && self.link == LinkState::Ready {
                    self.link = LinkState::Disconnected;
                }
            }
        }
    }

    /// Route one complete inbound message and act on the result
    pub async fn handle_worker_frame(&mut self, raw: &str) {
        match router::route(&mut self.store, raw) {
            Dispatch::Devices { follow_up } => self.send_to_worker(follow_up).await,
            Dispatch::Focus(Some(change)) => self.push_focus(&change),
            Dispatch::Focus(None) | Dispatch::Dropped => {}
        }
    }

    /// Tear everything down: poller, socket and process
    pub async fn shutdown(&mut self) {
        if let Some(poller) = self.poller.take() {
            poller.cancel();
        }
        self.worker.terminate().await;
        self.link = LinkState::Unbound;
    }

    async fn on_appear(&mut self, context: ActionId, controller: Controller, settings: ActionSelection) {
        self.bindings.bind(context, controller, settings);
        // New surfaces need a title even if focus has not changed
        self.store.request_refresh();

        if self.bring_up().await {
            self.send_to_worker(WorkerCommand::GetDevices).await;
        }
    }

    async fn on_disappear(&mut self, context: &ActionId) {
        if self.bindings.unbind(context).is_none() {
            debug!(action = %context, "disappear for unknown action");
            return;
        }

        if self.bindings.is_empty() {
            info!("last action gone, stopping worker");
            self.shutdown().await;
        }
    }

    fn on_settings(&mut self, context: &ActionId, settings: ActionSelection) {
        let Some(binding) = self.bindings.get_mut(context) else {
            debug!(action = %context, "settings for unknown action");
            return;
        };
        binding.selection = settings;

        self.push_dial_layout(context);
        self.send_device_options(context);
    }

    fn on_dial_rotate(&mut self, context: &ActionId, ticks: i32) {
        self.cycle_selection(context, ticks > 0);
        self.push_dial_layout(context);
    }

    async fn on_key_down(&mut self, context: &ActionId) {
        if self.cycle_selection(context, true) {
            self.apply_switch(context).await;
        }
    }

    async fn on_poll_tick(&mut self) {
        if self.bindings.is_empty() {
            return;
        }

        if self.link == LinkState::Disconnected {
            self.link = LinkState::Connecting;
        }
        self.send_to_worker(WorkerCommand::GetFocused).await;
    }

    /// Send over the shared link and keep the link state in step with it
    async fn send_to_worker(&mut self, command: WorkerCommand) {
        self.worker.send(command).await;

        match (self.link, self.worker.has_connection()) {
            (LinkState::Unbound, _) => {}
            (_, true) => self.link = LinkState::Ready,
            (LinkState::Ready | LinkState::Connecting, false) => {
                self.link = LinkState::Disconnected;
            }
            (LinkState::Disconnected, false) => {}
        }
    }

    /// Launch and connect if needed. Failures leave the action unresponsive
    /// until its next appear.
    async fn bring_up(&mut self) -> bool {
        if !self.worker.is_connected() {
            self.link = LinkState::Connecting;
            if let Err(e) = self.worker.ensure_connected(false).await {
                error!(error = %e, "could not reach worker");
                self.link = LinkState::Disconnected;
                return false;
            }
            info!("worker link ready");
        }

        self.link = LinkState::Ready;
        if self.poller.is_none() {
            if let Some(period) = self.poll_interval {
                self.poller = Some(FocusPoller::start(period, self.tick_tx.clone()));
            }
        }
        true
    }

    /// Step the action's selection and persist it. Returns whether it moved.
    fn cycle_selection(&mut self, context: &ActionId, forward: bool) -> bool {
        let Some(binding) = self.bindings.get_mut(context) else {
            debug!(action = %context, "input for unknown action");
            return false;
        };

        if !selection::cycle(&mut binding.selection, self.store.devices(), forward) {
            return false;
        }
        self.host.set_settings(&binding.id, &binding.selection);
        true
    }

    async fn apply_switch(&mut self, context: &ActionId) {
        let Some(binding) = self.bindings.get(context) else {
            debug!(action = %context, "switch for unknown action");
            return;
        };
        let Some(device) = selection::current_device(&binding.selection, self.store.devices())
        else {
            info!(action = %context, "no device configured for action");
            return;
        };
        let Some(process_id) = self
            .store
            .focus()
            .map(|f| f.process_id)
            .filter(|pid| *pid != 0)
        else {
            info!("no focused process to switch");
            return;
        };

        let device_id = device.id.clone();
        match switcher::switch_app_device(&self.worker_path, process_id, &device_id).await {
            Ok(()) => self.send_to_worker(WorkerCommand::GetFocused).await,
            Err(e) => error!(error = %e, process_id, device_id, "device switch failed"),
        }
    }

    fn push_focus(&mut self, change: &FocusChange) {
        let devices = self.store.devices();
        let focus = &change.focus;

        for binding in self.bindings.iter_mut() {
            self.host.set_title(&binding.id, &focus.process_name);
            if !binding.controller.has_feedback() {
                continue;
            }

            if !focus.device_id.is_empty()
                && binding.selection.cur_selected_device_id.as_deref() != Some(focus.device_id.as_str())
            {
                match selection::try_set_selected(&mut binding.selection, devices, &focus.device_id) {
                    Ok(()) => self.host.set_settings(&binding.id, &binding.selection),
                    Err(e) => debug!(action = %binding.id, error = %e, "focused device not selectable"),
                }
            }

            let value = selection::feedback_value(&binding.selection, devices, Some(focus));
            self.host.set_feedback(&binding.id, Feedback::value(value));

            if let Some(icon) = &change.fresh_icon {
                self.host.set_feedback(&binding.id, Feedback::png_icon(icon));
            }
        }
    }

    fn push_dial_layout(&mut self, context: &ActionId) {
        let Some(binding) = self.bindings.get(context) else {
            return;
        };
        if !binding.controller.has_feedback() {
            return;
        }

        let value =
            selection::feedback_value(&binding.selection, self.store.devices(), self.store.focus());
        self.host.set_feedback(context, Feedback::value(value));
    }

    fn send_device_options(&mut self, context: &ActionId) {
        let Some(binding) = self.bindings.get(context) else {
            warn!(action = %context, "inspector request for unknown action");
            return;
        };

        let items = selection::inspector_options(self.store.devices(), binding.selection.show_inactive);
        self.host.send_device_options(context, items);
    }
}
