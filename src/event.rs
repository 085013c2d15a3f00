use crossterm::event::{self, Event as CEvent, KeyEvent, KeyEventKind, MouseEvent};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

pub enum AppEvent {
    Key(KeyEvent),
    Mouse(MouseEvent),
    Resize(u16, u16),
}

/// Terminal input pump. Runs on its own thread for the life of the process.
pub struct EventHandler {
    rx: mpsc::UnboundedReceiver<AppEvent>,
    paused: Arc<AtomicBool>,
}

impl EventHandler {
    pub fn new(poll_rate: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let paused = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&paused);
        std::thread::spawn(move || loop {
            if flag.load(Ordering::Acquire) {
                std::thread::sleep(poll_rate);
                continue;
            }
            if event::poll(poll_rate).unwrap_or(false) {
                let evt = match event::read() {
                    Ok(CEvent::Key(key)) if key.kind != KeyEventKind::Release => AppEvent::Key(key),
                    Ok(CEvent::Mouse(mouse)) => AppEvent::Mouse(mouse),
                    Ok(CEvent::Resize(w, h)) => AppEvent::Resize(w, h),
                    _ => continue,
                };
                if tx.send(evt).is_err() {
                    break;
                }
            }
        });
        Self { rx, paused }
    }

    pub async fn next(&mut self) -> Option<AppEvent> {
        self.rx.recv().await
    }

    /// Stop reading stdin while a child process owns the terminal.
    pub fn suspend(&self) {
        self.paused.store(true, Ordering::Release);
    }

    pub fn resume(&mut self) {
        self.drain();
        self.paused.store(false, Ordering::Release);
    }

    /// Discard anything queued before the terminal was handed back.
    pub fn drain(&mut self) {
        while self.rx.try_recv().is_ok() {}
    }
}
