// SPDX-FileCopyrightText: 2025 Contributors to the switcher-stills project.
// SPDX-License-Identifier: Apache-2.0

//! Scripted in-process switcher driver shared by the integration tests.
//!
//! [`MockDriver`] implements the driver traits with behavior taken from a
//! [`MockBehavior`]. Asynchronous grants and transfer events are delivered from
//! worker threads, the way the real driver calls back from its own threads.
//! Call [`MockDriver::quiesce`] before checking reference counts so that no
//! worker still holds a callback.

#![allow(dead_code)]

use std::{
    sync::{
        Arc, Mutex, MutexGuard, Once, Weak,
        atomic::{AtomicUsize, Ordering},
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use switcher_stills::{
    DeviceSession, fourcc,
    driver::{
        ConnectRefusal, DriverCode, DriverResult, Frame, LockCallback, MediaPlayer,
        MediaPlayerSource, MediaPool, MediaPoolEvent, PixelFormat, StillHash, Stills,
        StillsCallback, Switcher, SwitcherDiscovery,
    },
};

/// Ensures logging is initialized only once across all tests.
static LOG_ONCE: Once = Once::new();

/// Initializes logging once (respects the RUST_LOG environment variable).
pub fn setup_logging() {
    LOG_ONCE.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::builder()
                    .with_default_directive(tracing::level_filters::LevelFilter::INFO.into())
                    .from_env_lossy(),
            )
            .with_test_writer()
            .try_init();
    });
}

/// How the mock answers a lock request.
#[derive(Debug, Clone)]
pub enum LockBehavior {
    /// Grant from a worker thread after the delay.
    Grant { after: Duration },
    /// Accept the request but never grant.
    Never,
    /// Reject the request synchronously.
    Fail(DriverCode),
}

/// How the mock answers an upload request.
#[derive(Debug, Clone)]
pub enum TransferBehavior {
    /// Send `noise` and then the completion event from a worker thread.
    Complete {
        after: Duration,
        noise: Vec<MediaPoolEvent>,
    },
    /// Accept the transfer but never finish it.
    Never,
    /// Snapshot the registered callbacks when the transfer starts and send
    /// the completion to that snapshot after the delay, whether or not the
    /// callbacks have been removed in the meantime.
    CompleteLate { after: Duration },
    /// Reject the request synchronously.
    Fail(DriverCode),
}

/// One still slot as the mock device reports it.
#[derive(Debug, Clone)]
pub struct MockSlot {
    pub name: DriverResult<String>,
    pub hash: DriverResult<StillHash>,
}

impl MockSlot {
    pub fn named(name: &str, hash_byte: u8) -> Self {
        MockSlot {
            name: Ok(name.to_string()),
            hash: Ok(StillHash([hash_byte; 16])),
        }
    }
}

/// Script for a [`MockDriver`].
#[derive(Debug, Clone)]
pub struct MockBehavior {
    pub refusal: Option<ConnectRefusal>,
    pub media_pool_failure: Option<DriverCode>,
    pub stills_failure: Option<DriverCode>,
    pub product_name: DriverResult<String>,
    pub video_mode: DriverResult<u32>,
    pub count_failure: Option<DriverCode>,
    pub slots: Vec<MockSlot>,
    pub players: DriverResult<Vec<DriverResult<MediaPlayerSource>>>,
    pub frame_failure: Option<DriverCode>,
    /// Frame length to hand out instead of `width * height * 4`.
    pub frame_len: Option<usize>,
    pub add_callback_failure: Option<DriverCode>,
    /// Before granting, report another client's transfer as completed.
    pub foreign_completion_before_grant: bool,
    pub lock: LockBehavior,
    pub transfer: TransferBehavior,
}

impl Default for MockBehavior {
    fn default() -> Self {
        MockBehavior {
            refusal: None,
            media_pool_failure: None,
            stills_failure: None,
            product_name: Ok("ATEM Television Studio HD".to_string()),
            video_mode: Ok(fourcc(b"10pa")),
            count_failure: None,
            slots: (1..=4u8)
                .map(|n| MockSlot::named(&format!("Still {n}"), n))
                .collect(),
            players: Ok(vec![
                Ok(MediaPlayerSource::Still(2)),
                Ok(MediaPlayerSource::Clip(0)),
                Ok(MediaPlayerSource::Still(0)),
            ]),
            frame_failure: None,
            frame_len: None,
            add_callback_failure: None,
            foreign_completion_before_grant: false,
            lock: LockBehavior::Grant {
                after: Duration::from_millis(5),
            },
            transfer: TransferBehavior::Complete {
                after: Duration::from_millis(5),
                noise: Vec::new(),
            },
        }
    }
}

/// An upload the mock device accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRecord {
    pub slot: u32,
    pub name: String,
    pub bytes: Vec<u8>,
}

#[derive(Default)]
struct MockState {
    calls: Vec<String>,
    callbacks: Vec<Arc<dyn StillsCallback>>,
    lock_holder: Option<Arc<dyn LockCallback>>,
    overlapping_locks: usize,
    held_frames: Vec<Arc<dyn Frame>>,
    uploads: Vec<UploadRecord>,
    seen_callbacks: Vec<Weak<dyn StillsCallback>>,
    seen_lock_callbacks: Vec<Weak<dyn LockCallback>>,
    workers: Vec<JoinHandle<()>>,
}

#[derive(Default)]
struct LiveCounts {
    switchers: AtomicUsize,
    media_pools: AtomicUsize,
    stills: AtomicUsize,
    frames: AtomicUsize,
}

struct Shared {
    behavior: MockBehavior,
    state: Mutex<MockState>,
    live: LiveCounts,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    fn record(&self, call: impl Into<String>) {
        self.state().calls.push(call.into());
    }
}

/// Scripted driver. Clones share the same device state.
#[derive(Clone)]
pub struct MockDriver {
    shared: Arc<Shared>,
}

impl MockDriver {
    pub fn new(behavior: MockBehavior) -> Self {
        MockDriver {
            shared: Arc::new(Shared {
                behavior,
                state: Mutex::new(MockState::default()),
                live: LiveCounts::default(),
            }),
        }
    }

    pub fn discovery(&self) -> Arc<dyn SwitcherDiscovery> {
        Arc::new(self.clone())
    }

    /// Connects a session through this driver.
    pub fn connect(&self) -> DeviceSession {
        DeviceSession::connect(self, "10.0.0.1").unwrap()
    }

    /// Driver calls in the order they were made.
    pub fn calls(&self) -> Vec<String> {
        self.shared.state().calls.clone()
    }

    /// Number of recorded calls named `call`.
    pub fn call_count(&self, call: &str) -> usize {
        self.shared
            .state()
            .calls
            .iter()
            .filter(|recorded| *recorded == call)
            .count()
    }

    pub fn uploads(&self) -> Vec<UploadRecord> {
        self.shared.state().uploads.clone()
    }

    /// Lock requests made while another request was still outstanding.
    pub fn overlapping_locks(&self) -> usize {
        self.shared.state().overlapping_locks
    }

    /// Switcher, media pool and stills handles not yet released.
    pub fn live_handles(&self) -> usize {
        let live = &self.shared.live;
        live.switchers.load(Ordering::SeqCst)
            + live.media_pools.load(Ordering::SeqCst)
            + live.stills.load(Ordering::SeqCst)
    }

    pub fn live_frames(&self) -> usize {
        self.shared.live.frames.load(Ordering::SeqCst)
    }

    /// Joins every worker thread, including workers spawned while joining.
    pub fn quiesce(&self) {
        loop {
            let workers = std::mem::take(&mut self.shared.state().workers);
            if workers.is_empty() {
                return;
            }
            for worker in workers {
                worker.join().unwrap();
            }
        }
    }

    /// Asserts that every callback, lock and frame given to the driver has
    /// been handed back and that nothing else keeps them alive.
    pub fn assert_released(&self) {
        self.quiesce();
        let state = self.shared.state();
        assert!(state.callbacks.is_empty(), "stills callback still registered");
        assert!(state.lock_holder.is_none(), "media pool lock still held");
        assert!(state.held_frames.is_empty(), "driver still holds a frame");
        assert!(
            state.seen_callbacks.iter().all(|weak| weak.upgrade().is_none()),
            "stills callback outlived the upload"
        );
        assert!(
            state
                .seen_lock_callbacks
                .iter()
                .all(|weak| weak.upgrade().is_none()),
            "lock callback outlived the upload"
        );
        drop(state);
        assert_eq!(self.live_frames(), 0, "frame outlived the upload");
    }

    fn spawn(&self, work: impl FnOnce(Arc<Shared>) + Send + 'static) {
        let shared = Arc::clone(&self.shared);
        let worker = thread::spawn(move || work(shared));
        self.shared.state().workers.push(worker);
    }
}

impl SwitcherDiscovery for MockDriver {
    fn connect_to(&self, address: &str) -> Result<Box<dyn Switcher>, ConnectRefusal> {
        self.shared.record(format!("connect {address}"));
        if let Some(refusal) = self.shared.behavior.refusal {
            return Err(refusal);
        }
        self.shared.live.switchers.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockSwitcher {
            driver: self.clone(),
        }))
    }
}

struct MockSwitcher {
    driver: MockDriver,
}

impl Drop for MockSwitcher {
    fn drop(&mut self) {
        self.driver.shared.live.switchers.fetch_sub(1, Ordering::SeqCst);
        self.driver.shared.record("release switcher");
    }
}

struct MockPlayer {
    source: DriverResult<MediaPlayerSource>,
}

impl MediaPlayer for MockPlayer {
    fn source(&self) -> DriverResult<MediaPlayerSource> {
        self.source
    }
}

impl Switcher for MockSwitcher {
    fn product_name(&self) -> DriverResult<String> {
        self.driver.shared.behavior.product_name.clone()
    }

    fn video_mode(&self) -> DriverResult<u32> {
        self.driver.shared.behavior.video_mode
    }

    fn media_players(&self) -> DriverResult<Box<dyn Iterator<Item = Box<dyn MediaPlayer>> + '_>> {
        let players = self.driver.shared.behavior.players.as_ref().map_err(|code| *code)?;
        Ok(Box::new(players.iter().map(|source| {
            Box::new(MockPlayer { source: *source }) as Box<dyn MediaPlayer>
        })))
    }

    fn media_pool(&self) -> DriverResult<Arc<dyn MediaPool>> {
        if let Some(code) = self.driver.shared.behavior.media_pool_failure {
            return Err(code);
        }
        self.driver.shared.live.media_pools.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(MockMediaPool {
            driver: self.driver.clone(),
        }))
    }
}

struct MockMediaPool {
    driver: MockDriver,
}

impl Drop for MockMediaPool {
    fn drop(&mut self) {
        self.driver.shared.live.media_pools.fetch_sub(1, Ordering::SeqCst);
        self.driver.shared.record("release media pool");
    }
}

impl MediaPool for MockMediaPool {
    fn create_frame(
        &self,
        format: PixelFormat,
        width: u32,
        height: u32,
    ) -> DriverResult<Box<dyn Frame>> {
        let behavior = &self.driver.shared.behavior;
        if let Some(code) = behavior.frame_failure {
            return Err(code);
        }
        let len = behavior
            .frame_len
            .unwrap_or(width as usize * height as usize * format.bytes_per_pixel());
        self.driver.shared.live.frames.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockFrame {
            bytes: vec![0; len],
            driver: self.driver.clone(),
        }))
    }

    fn stills(&self) -> DriverResult<Arc<dyn Stills>> {
        if let Some(code) = self.driver.shared.behavior.stills_failure {
            return Err(code);
        }
        self.driver.shared.live.stills.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(MockStills {
            driver: self.driver.clone(),
        }))
    }
}

struct MockFrame {
    bytes: Vec<u8>,
    driver: MockDriver,
}

impl Drop for MockFrame {
    fn drop(&mut self) {
        self.driver.shared.live.frames.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Frame for MockFrame {
    fn bytes(&self) -> DriverResult<&[u8]> {
        Ok(&self.bytes)
    }

    fn bytes_mut(&mut self) -> DriverResult<&mut [u8]> {
        Ok(&mut self.bytes)
    }
}

struct MockStills {
    driver: MockDriver,
}

impl Drop for MockStills {
    fn drop(&mut self) {
        self.driver.shared.live.stills.fetch_sub(1, Ordering::SeqCst);
        self.driver.shared.record("release stills");
    }
}

impl MockStills {
    fn slot(&self, index: u32) -> DriverResult<&MockSlot> {
        self.driver
            .shared
            .behavior
            .slots
            .get(index as usize)
            .ok_or(DriverCode::FAIL)
    }
}

impl Stills for MockStills {
    fn count(&self) -> DriverResult<u32> {
        match self.driver.shared.behavior.count_failure {
            Some(code) => Err(code),
            None => Ok(self.driver.shared.behavior.slots.len() as u32),
        }
    }

    fn name(&self, index: u32) -> DriverResult<String> {
        self.slot(index)?.name.clone()
    }

    fn hash(&self, index: u32) -> DriverResult<StillHash> {
        self.slot(index)?.hash
    }

    fn add_callback(&self, callback: Arc<dyn StillsCallback>) -> DriverResult<()> {
        let shared = &self.driver.shared;
        let mut state = shared.state();
        state.calls.push("add_callback".to_string());
        if let Some(code) = shared.behavior.add_callback_failure {
            return Err(code);
        }
        state.seen_callbacks.push(Arc::downgrade(&callback));
        state.callbacks.push(callback);
        Ok(())
    }

    fn remove_callback(&self, callback: &Arc<dyn StillsCallback>) -> DriverResult<()> {
        let mut state = self.driver.shared.state();
        state.calls.push("remove_callback".to_string());
        let before = state.callbacks.len();
        state
            .callbacks
            .retain(|registered| !Arc::ptr_eq(registered, callback));
        if state.callbacks.len() == before {
            return Err(DriverCode::FAIL);
        }
        Ok(())
    }

    fn lock(&self, callback: Arc<dyn LockCallback>) -> DriverResult<()> {
        {
            let mut state = self.driver.shared.state();
            state.calls.push("lock".to_string());
            if let LockBehavior::Fail(code) = self.driver.shared.behavior.lock {
                return Err(code);
            }
            if state.lock_holder.is_some() {
                state.overlapping_locks += 1;
            }
            state.seen_lock_callbacks.push(Arc::downgrade(&callback));
            state.lock_holder = Some(Arc::clone(&callback));
        }

        if let LockBehavior::Grant { after } = self.driver.shared.behavior.lock {
            let foreign_completion = self.driver.shared.behavior.foreign_completion_before_grant;
            self.driver.spawn(move |shared| {
                if foreign_completion {
                    let callbacks = shared.state().callbacks.clone();
                    for registered in &callbacks {
                        registered.notify(MediaPoolEvent::TransferCompleted, 17);
                    }
                }
                thread::sleep(after);
                callback.obtained();
            });
        }
        Ok(())
    }

    fn unlock(&self, callback: &Arc<dyn LockCallback>) -> DriverResult<()> {
        let mut state = self.driver.shared.state();
        state.calls.push("unlock".to_string());
        match state.lock_holder.take() {
            Some(holder) if Arc::ptr_eq(&holder, callback) => Ok(()),
            other => {
                state.lock_holder = other;
                Err(DriverCode::FAIL)
            }
        }
    }

    fn upload(&self, index: u32, name: &str, frame: Arc<dyn Frame>) -> DriverResult<()> {
        {
            let mut state = self.driver.shared.state();
            state.calls.push("upload".to_string());
            if let TransferBehavior::Fail(code) = self.driver.shared.behavior.transfer {
                return Err(code);
            }
            state.uploads.push(UploadRecord {
                slot: index,
                name: name.to_string(),
                bytes: frame.bytes()?.to_vec(),
            });
            state.held_frames.push(Arc::clone(&frame));
        }

        if let TransferBehavior::CompleteLate { after } = self.driver.shared.behavior.transfer {
            let callbacks = self.driver.shared.state().callbacks.clone();
            drop(frame);
            self.driver.spawn(move |_| {
                thread::sleep(after);
                for callback in &callbacks {
                    callback.notify(MediaPoolEvent::TransferCompleted, index as i32);
                }
            });
            return Ok(());
        }

        if let TransferBehavior::Complete { after, noise } = &self.driver.shared.behavior.transfer {
            let (after, noise) = (*after, noise.clone());
            self.driver.spawn(move |shared| {
                thread::sleep(after);
                let callbacks = {
                    let mut state = shared.state();
                    state.held_frames.retain(|held| !Arc::ptr_eq(held, &frame));
                    state.callbacks.clone()
                };
                drop(frame);
                for callback in &callbacks {
                    for event in &noise {
                        callback.notify(*event, index as i32);
                    }
                    callback.notify(MediaPoolEvent::TransferCompleted, index as i32);
                }
            });
        }
        Ok(())
    }

    fn cancel_transfer(&self) -> DriverResult<()> {
        let mut state = self.driver.shared.state();
        state.calls.push("cancel_transfer".to_string());
        state.held_frames.clear();
        Ok(())
    }
}
