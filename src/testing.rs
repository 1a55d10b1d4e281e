/// In-memory fakes of the platform seams, driven on a virtual clock
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet, VecDeque};
use std::future::Future;
use std::pin::{Pin, pin};
use std::rc::{Rc, Weak};
use std::task::{Context, Poll, Waker};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use futures::channel::oneshot;
use futures::executor::{LocalPool, LocalSpawner};
use futures::future::LocalBoxFuture;
use futures::task::{LocalSpawnExt, noop_waker};
use serde_json::Value;

use crate::error::{StoreError, WallpaperError};
use crate::platform::{
    HttpClient, HttpResponse, ImageFile, ImageLoader, IntervalHandle, KeyValueStore, Platform,
    Runtime,
};

pub fn at(y: i32, m: u32, d: u32, hour: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(hour, min, 0)
        .unwrap()
}

// Virtual clock

#[derive(Default)]
struct ClockState {
    elapsed_ms: Cell<u64>,
    next_id: Cell<u64>,
    sleepers: RefCell<Vec<(u64, u64, Waker)>>,
}

struct Sleep {
    clock: Rc<ClockState>,
    id: u64,
    deadline: u64,
    slept: Rc<RefCell<Vec<u32>>>,
    ms: u32,
}

impl Future for Sleep {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.clock.elapsed_ms.get() >= self.deadline {
            self.slept.borrow_mut().push(self.ms);
            return Poll::Ready(());
        }
        let mut sleepers = self.clock.sleepers.borrow_mut();
        sleepers.retain(|(id, _, _)| *id != self.id);
        sleepers.push((self.id, self.deadline, cx.waker().clone()));
        Poll::Pending
    }
}

impl Drop for Sleep {
    fn drop(&mut self) {
        self.clock
            .sleepers
            .borrow_mut()
            .retain(|(id, _, _)| *id != self.id);
    }
}

type Tick = Rc<Box<dyn Fn()>>;

pub struct FakeRuntime {
    start: Cell<NaiveDateTime>,
    clock: Rc<ClockState>,
    slept: Rc<RefCell<Vec<u32>>>,
    spawner: LocalSpawner,
    intervals: RefCell<Vec<(u32, Tick, Weak<()>)>>,
}

impl FakeRuntime {
    fn new(start: NaiveDateTime, spawner: LocalSpawner) -> FakeRuntime {
        FakeRuntime {
            start: Cell::new(start),
            clock: Rc::new(ClockState::default()),
            slept: Rc::new(RefCell::new(Vec::new())),
            spawner,
            intervals: RefCell::new(Vec::new()),
        }
    }

    /// Move the wall clock without touching pending timers
    pub fn set_now(&self, now: NaiveDateTime) {
        let elapsed = TimeDelta::milliseconds(self.clock.elapsed_ms.get() as i64);
        self.start.set(now - elapsed);
    }

    /// Completed sleeps, in order
    pub fn slept(&self) -> Vec<u32> {
        self.slept.borrow().clone()
    }

    /// Jump to the earliest pending sleep and wake everything due.
    /// Returns false when nothing is waiting on time.
    fn advance(&self) -> bool {
        let next = self
            .clock
            .sleepers
            .borrow()
            .iter()
            .map(|(_, deadline, _)| *deadline)
            .min();
        let Some(deadline) = next else {
            return false;
        };

        self.clock.elapsed_ms.set(deadline);
        let due: Vec<Waker> = {
            let mut sleepers = self.clock.sleepers.borrow_mut();
            let (due, waiting): (Vec<_>, Vec<_>) =
                sleepers.drain(..).partition(|(_, d, _)| *d <= deadline);
            *sleepers = waiting;
            due.into_iter().map(|(_, _, waker)| waker).collect()
        };
        due.into_iter().for_each(Waker::wake);
        true
    }

    pub fn active_intervals(&self) -> usize {
        self.intervals
            .borrow()
            .iter()
            .filter(|(_, _, alive)| alive.upgrade().is_some())
            .count()
    }

    pub fn interval_periods(&self) -> Vec<u32> {
        self.intervals
            .borrow()
            .iter()
            .filter(|(_, _, alive)| alive.upgrade().is_some())
            .map(|(ms, _, _)| *ms)
            .collect()
    }

    /// Fire every live interval once
    pub fn fire_intervals(&self) {
        let ticks: Vec<Tick> = self
            .intervals
            .borrow()
            .iter()
            .filter(|(_, _, alive)| alive.upgrade().is_some())
            .map(|(_, tick, _)| Rc::clone(tick))
            .collect();
        for tick in ticks {
            tick();
        }
    }
}

#[async_trait(?Send)]
impl Runtime for FakeRuntime {
    fn now(&self) -> NaiveDateTime {
        self.start.get() + TimeDelta::milliseconds(self.clock.elapsed_ms.get() as i64)
    }

    async fn sleep(&self, ms: u32) {
        let id = self.clock.next_id.get();
        self.clock.next_id.set(id + 1);
        Sleep {
            clock: Rc::clone(&self.clock),
            id,
            deadline: self.clock.elapsed_ms.get() + u64::from(ms),
            slept: Rc::clone(&self.slept),
            ms,
        }
        .await
    }

    fn every(&self, ms: u32, tick: Box<dyn Fn()>) -> IntervalHandle {
        let alive = Rc::new(());
        self.intervals
            .borrow_mut()
            .push((ms, Rc::new(tick), Rc::downgrade(&alive)));
        IntervalHandle::new(alive)
    }

    fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
        self.spawner.spawn_local(task).unwrap();
    }
}

// Key-value store

#[derive(Default)]
pub struct MemoryStore {
    values: RefCell<HashMap<String, Value>>,
    listeners: RefCell<Vec<(String, Rc<dyn Fn(Value)>)>>,
    failing_gets: Cell<u32>,
    failing_sets: Cell<u32>,
    sets: Cell<u32>,
}

impl MemoryStore {
    pub fn insert(&self, key: &str, value: Value) {
        self.values.borrow_mut().insert(key.to_string(), value);
    }

    pub fn value(&self, key: &str) -> Option<Value> {
        self.values.borrow().get(key).cloned()
    }

    /// Fail the next `n` reads
    pub fn fail_gets(&self, n: u32) {
        self.failing_gets.set(n);
    }

    /// Fail the next `n` writes
    pub fn fail_sets(&self, n: u32) {
        self.failing_sets.set(n);
    }

    /// Write attempts, failed ones included
    pub fn set_count(&self) -> u32 {
        self.sets.get()
    }

    /// Simulate a write from another tab
    pub fn external_write(&self, key: &str, value: Value) {
        self.insert(key, value.clone());
        let listeners: Vec<Rc<dyn Fn(Value)>> = self
            .listeners
            .borrow()
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, cb)| Rc::clone(cb))
            .collect();
        for cb in listeners {
            cb(value.clone());
        }
    }
}

#[async_trait(?Send)]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        if self.failing_gets.get() > 0 {
            self.failing_gets.set(self.failing_gets.get() - 1);
            return Err(StoreError::Backend("read failed".to_string()));
        }
        Ok(self.value(key))
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.sets.set(self.sets.get() + 1);
        if self.failing_sets.get() > 0 {
            self.failing_sets.set(self.failing_sets.get() - 1);
            return Err(StoreError::Backend("Storage quota exceeded".to_string()));
        }
        self.insert(key, value);
        Ok(())
    }

    fn on_change(&self, key: &str, callback: Box<dyn Fn(Value)>) {
        self.listeners
            .borrow_mut()
            .push((key.to_string(), Rc::from(callback)));
    }
}

// HTTP

enum Reply {
    Respond(Result<HttpResponse, String>),
    Hang,
}

/// Scripted HTTP responses per URL. The last scripted reply for a URL
/// repeats; unscripted URLs fail as unreachable.
#[derive(Default)]
pub struct FakeHttp {
    routes: RefCell<HashMap<String, VecDeque<Rc<Reply>>>>,
    calls: RefCell<Vec<String>>,
    gate: RefCell<Option<oneshot::Receiver<()>>>,
}

impl FakeHttp {
    fn push(&self, url: &str, reply: Reply) {
        self.routes
            .borrow_mut()
            .entry(url.to_string())
            .or_default()
            .push_back(Rc::new(reply));
    }

    pub fn respond(&self, url: &str, response: Result<HttpResponse, String>) {
        self.push(url, Reply::Respond(response));
    }

    pub fn respond_json(&self, url: &str, body: &str) {
        self.respond(url, Ok(HttpResponse::ok(body)));
    }

    pub fn respond_image_url(&self, url: &str, image_url: &str) {
        self.respond_json(url, &format!(r#"{{"imgurl":"{image_url}"}}"#));
    }

    pub fn fail(&self, url: &str, times: u32, message: &str) {
        for _ in 0..times {
            self.respond(url, Err(message.to_string()));
        }
    }

    pub fn hang(&self, url: &str) {
        self.push(url, Reply::Hang);
    }

    /// Hold the next request until the returned sender fires
    pub fn hold_next(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.gate.borrow_mut() = Some(rx);
        tx
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }

    fn next_reply(&self, url: &str) -> Option<Rc<Reply>> {
        let mut routes = self.routes.borrow_mut();
        let queue = routes.get_mut(url)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait(?Send)]
impl HttpClient for FakeHttp {
    async fn get(&self, url: &str) -> Result<HttpResponse, String> {
        self.calls.borrow_mut().push(url.to_string());
        let gate = self.gate.borrow_mut().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        match self.next_reply(url).as_deref() {
            Some(Reply::Respond(result)) => result.clone(),
            Some(Reply::Hang) => futures::future::pending().await,
            None => Err(format!("unreachable: {url}")),
        }
    }
}

// Images

#[derive(Default)]
pub struct FakeImages {
    broken: RefCell<HashSet<String>>,
    hanging: RefCell<HashSet<String>>,
    flaky: RefCell<HashMap<String, u32>>,
    loads: RefCell<Vec<String>>,
}

impl FakeImages {
    pub fn break_url(&self, url: &str) {
        self.broken.borrow_mut().insert(url.to_string());
    }

    pub fn hang_url(&self, url: &str) {
        self.hanging.borrow_mut().insert(url.to_string());
    }

    /// Fail the first `times` loads of `url`
    pub fn flaky_url(&self, url: &str, times: u32) {
        self.flaky.borrow_mut().insert(url.to_string(), times);
    }

    pub fn loads(&self) -> Vec<String> {
        self.loads.borrow().clone()
    }

    pub fn load_count(&self, url: &str) -> usize {
        self.loads.borrow().iter().filter(|u| *u == url).count()
    }
}

#[async_trait(?Send)]
impl ImageLoader for FakeImages {
    async fn load(&self, url: &str) -> Result<(), String> {
        self.loads.borrow_mut().push(url.to_string());
        if self.hanging.borrow().contains(url) {
            return futures::future::pending().await;
        }
        if self.broken.borrow().contains(url) {
            return Err(format!("failed to load {url}"));
        }
        if let Some(remaining) = self.flaky.borrow_mut().get_mut(url) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(format!("flaky load of {url}"));
            }
        }
        Ok(())
    }
}

// Files

pub struct FakeFile {
    pub mime: String,
    pub size: u64,
}

impl FakeFile {
    pub fn new(mime: &str, size: u64) -> FakeFile {
        FakeFile {
            mime: mime.to_string(),
            size,
        }
    }
}

#[async_trait(?Send)]
impl ImageFile for FakeFile {
    fn mime_type(&self) -> String {
        self.mime.clone()
    }

    fn size(&self) -> u64 {
        self.size
    }

    async fn read_data_uri(&self) -> Result<String, WallpaperError> {
        Ok(format!("data:{};base64,iVBORw0KGgo=", self.mime))
    }
}

// Harness

pub struct Harness {
    pool: RefCell<LocalPool>,
    pub runtime: Rc<FakeRuntime>,
    pub store: Rc<MemoryStore>,
    pub http: Rc<FakeHttp>,
    pub images: Rc<FakeImages>,
}

impl Harness {
    /// A harness whose clock starts at 2024-01-15 10:00 local time
    pub fn new() -> Harness {
        Harness::starting_at(at(2024, 1, 15, 10, 0))
    }

    pub fn starting_at(now: NaiveDateTime) -> Harness {
        let pool = LocalPool::new();
        let runtime = Rc::new(FakeRuntime::new(now, pool.spawner()));
        Harness {
            pool: RefCell::new(pool),
            runtime,
            store: Rc::new(MemoryStore::default()),
            http: Rc::new(FakeHttp::default()),
            images: Rc::new(FakeImages::default()),
        }
    }

    pub fn platform(&self) -> Platform {
        Platform {
            store: self.store.clone(),
            http: self.http.clone(),
            images: self.images.clone(),
            runtime: self.runtime.clone(),
        }
    }

    pub fn spawn(&self, task: impl Future<Output = ()> + 'static) {
        self.pool.borrow().spawner().spawn_local(task).unwrap();
    }

    /// Run spawned tasks as far as they go without moving the clock
    pub fn run_until_stalled(&self) {
        self.pool.borrow_mut().run_until_stalled();
    }

    /// Drive `fut` and every spawned task to completion, jumping the
    /// virtual clock whenever everything is waiting on a timer.
    pub fn block_on<F: Future>(&self, fut: F) -> F::Output {
        let mut fut = pin!(fut);
        let waker = noop_waker();
        let mut cx = Context::from_waker(&waker);

        loop {
            if let Poll::Ready(output) = fut.as_mut().poll(&mut cx) {
                return output;
            }
            self.run_until_stalled();
            if let Poll::Ready(output) = fut.as_mut().poll(&mut cx) {
                return output;
            }
            assert!(
                self.runtime.advance(),
                "future stalled with no pending timers"
            );
        }
    }

    /// Run spawned tasks to completion, advancing timers as needed
    pub fn settle(&self) {
        loop {
            self.run_until_stalled();
            if !self.runtime.advance() {
                return;
            }
        }
    }
}
