//! In-memory stand-ins for the hardware seams, shared by the unit tests.

use crate::clock::Clock;
use crate::connectivity::{ConnectionState, Radio};
use crate::http::{HttpClient, Response};
use crate::lcd::{CharDisplay, DisplayError};
use anyhow::{anyhow, bail};
use chrono::NaiveTime;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::net::{IpAddr, Ipv4Addr};
use std::rc::Rc;

#[derive(Debug)]
struct ClockState {
    now: Cell<u64>,
    sleeps: RefCell<Vec<u64>>,
}

/// Simulated clock: sleeping advances time instantly.
#[derive(Debug, Clone)]
pub struct FakeClock {
    state: Rc<ClockState>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            state: Rc::new(ClockState {
                now: Cell::new(0),
                sleeps: RefCell::new(Vec::new()),
            }),
        }
    }

    pub fn advance(&self, ms: u64) {
        self.state.now.set(self.state.now.get() + ms);
    }

    pub fn sleeps(&self) -> Vec<u64> {
        self.state.sleeps.borrow().clone()
    }

    pub fn clear_sleeps(&self) {
        self.state.sleeps.borrow_mut().clear();
    }
}

impl Clock for FakeClock {
    fn now_ms(&self) -> u64 {
        self.state.now.get()
    }

    fn sleep_ms(&self, ms: u64) {
        self.state.sleeps.borrow_mut().push(ms);
        self.advance(ms);
    }

    fn time_of_day(&self) -> NaiveTime {
        NaiveTime::from_hms_opt(12, 34, 56).unwrap_or_default()
    }
}

type Reply = Result<(u16, String), String>;

#[derive(Default)]
struct HttpState {
    replies: HashMap<String, VecDeque<Reply>>,
    requests: Vec<String>,
}

/// Scripted HTTP: replies are queued per URL, the last one repeats.
#[derive(Clone, Default)]
pub struct FakeHttp {
    state: Rc<RefCell<HttpState>>,
}

impl FakeHttp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&mut self, url: &str, status: u16, body: &str) {
        self.push(url, Ok((status, body.to_string())));
    }

    pub fn fail(&mut self, url: &str, error: &str) {
        self.push(url, Err(error.to_string()));
    }

    fn push(&mut self, url: &str, reply: Reply) {
        self.state
            .borrow_mut()
            .replies
            .entry(url.to_string())
            .or_default()
            .push_back(reply);
    }

    pub fn requests(&self) -> Vec<String> {
        self.state.borrow().requests.clone()
    }

    pub fn request_count(&self, url: &str) -> usize {
        self.state
            .borrow()
            .requests
            .iter()
            .filter(|request| request.as_str() == url)
            .count()
    }
}

impl HttpClient for FakeHttp {
    fn get(&mut self, url: &str) -> anyhow::Result<Response> {
        let mut state = self.state.borrow_mut();
        state.requests.push(url.to_string());
        let queue = state
            .replies
            .get_mut(url)
            .ok_or_else(|| anyhow!("no route to {url}"))?;
        let reply = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        match reply {
            Some(Ok((status, body))) => Ok(Response {
                status,
                body: body.into_bytes(),
            }),
            Some(Err(error)) => Err(anyhow!(error)),
            None => bail!("no route to {url}"),
        }
    }
}

#[derive(Default)]
struct DisplayState {
    row: u8,
    lines: Vec<String>,
    writes: Vec<String>,
    frames: Vec<(String, String)>,
    clears: u32,
    fail: bool,
}

/// Character display that records what was drawn. A frame is a top line
/// followed by a bottom line.
#[derive(Clone, Default)]
pub struct RecordingDisplay {
    state: Rc<RefCell<DisplayState>>,
}

impl RecordingDisplay {
    pub fn fail_writes(&mut self, fail: bool) {
        self.state.borrow_mut().fail = fail;
    }

    pub fn lines(&self) -> Vec<String> {
        self.state.borrow().lines.clone()
    }

    pub fn writes(&self) -> Vec<String> {
        self.state.borrow().writes.clone()
    }

    pub fn frames(&self) -> Vec<(String, String)> {
        self.state.borrow().frames.clone()
    }

    pub fn clears(&self) -> u32 {
        self.state.borrow().clears
    }
}

impl CharDisplay for RecordingDisplay {
    fn clear(&mut self) -> Result<(), DisplayError> {
        let mut state = self.state.borrow_mut();
        state.clears += 1;
        state.lines.clear();
        Ok(())
    }

    fn set_cursor(&mut self, _col: u8, row: u8) -> Result<(), DisplayError> {
        let mut state = self.state.borrow_mut();
        if state.fail {
            return Err(DisplayError::Bus {
                address: 0x27,
                kind: embedded_hal::i2c::ErrorKind::Bus,
            });
        }
        state.row = row;
        Ok(())
    }

    fn write_str(&mut self, text: &str) -> Result<(), DisplayError> {
        let mut state = self.state.borrow_mut();
        let row = usize::from(state.row);
        if state.lines.len() <= row {
            state.lines.resize(row + 1, String::new());
        }
        state.lines[row] = text.to_string();
        state.writes.push(text.to_string());
        if row == 1 {
            let top = state.lines[0].clone();
            state.frames.push((top, text.to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct RadioState {
    active: bool,
    connected: bool,
    pending_since: Option<u64>,
    script: VecDeque<Option<u64>>,
    connect_calls: u32,
    disconnect_calls: u32,
    deactivations: u32,
    resolved: Vec<String>,
    dns_fails: bool,
}

/// Station interface driven by a script: each `connect` call takes the next
/// entry, `Some(ms)` associating after that delay and `None` never. An
/// empty script never associates.
#[derive(Debug, Clone)]
pub struct FakeRadio {
    clock: FakeClock,
    state: Rc<RefCell<RadioState>>,
}

impl FakeRadio {
    pub fn new(clock: &FakeClock) -> Self {
        Self {
            clock: clock.clone(),
            state: Rc::new(RefCell::new(RadioState::default())),
        }
    }

    pub fn script(&self, outcomes: impl IntoIterator<Item = Option<u64>>) {
        self.state.borrow_mut().script.extend(outcomes);
    }

    pub fn drop_link(&self) {
        let mut state = self.state.borrow_mut();
        state.connected = false;
        state.pending_since = None;
    }

    pub fn fail_dns(&self) {
        self.state.borrow_mut().dns_fails = true;
    }

    pub fn connect_calls(&self) -> u32 {
        self.state.borrow().connect_calls
    }

    pub fn disconnect_calls(&self) -> u32 {
        self.state.borrow().disconnect_calls
    }

    pub fn deactivations(&self) -> u32 {
        self.state.borrow().deactivations
    }

    pub fn resolved(&self) -> Vec<String> {
        self.state.borrow().resolved.clone()
    }
}

impl Radio for FakeRadio {
    fn is_active(&self) -> bool {
        self.state.borrow().active
    }

    fn set_active(&mut self, active: bool) -> anyhow::Result<()> {
        let mut state = self.state.borrow_mut();
        if state.active && !active {
            state.deactivations += 1;
            state.connected = false;
            state.pending_since = None;
        }
        state.active = active;
        Ok(())
    }

    fn connect(&mut self, _ssid: &str, _password: &str) -> anyhow::Result<()> {
        let now = self.clock.now_ms();
        let mut state = self.state.borrow_mut();
        state.connect_calls += 1;
        let delay = state.script.pop_front().flatten();
        state.pending_since = delay.map(|delay| now + delay);
        Ok(())
    }

    fn disconnect(&mut self) -> anyhow::Result<()> {
        let mut state = self.state.borrow_mut();
        state.disconnect_calls += 1;
        state.connected = false;
        state.pending_since = None;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        let now = self.clock.now_ms();
        let mut state = self.state.borrow_mut();
        if state.active && !state.connected {
            if let Some(at) = state.pending_since {
                if now >= at {
                    state.connected = true;
                    state.pending_since = None;
                }
            }
        }
        state.active && state.connected
    }

    fn state(&self) -> ConnectionState {
        if !self.is_connected() {
            return ConnectionState::default();
        }
        ConnectionState {
            is_connected: true,
            ip: Some("192.168.1.50".into()),
            mask: Some("255.255.255.0".into()),
            gateway: Some("192.168.1.1".into()),
            dns: Some("192.168.1.1".into()),
        }
    }

    fn resolve_host(&self, host: &str, _port: u16) -> anyhow::Result<IpAddr> {
        let mut state = self.state.borrow_mut();
        state.resolved.push(host.to_string());
        if state.dns_fails {
            bail!("lookup of {host} failed");
        }
        Ok(IpAddr::V4(Ipv4Addr::new(93, 184, 216, 34)))
    }
}
