//! Observability hooks.
//!
//! The machine reports everything noteworthy through an [`Observer`]
//! handed to it at construction, rather than writing to a log directly.
use crate::{
    constants::Address,
    display::VideoMode,
    error::{Fault, OutOfBounds},
    op::Op,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// An instruction is about to be executed.
    Exec { pc: Address, op: Op },
    /// A memory or pixel access was rejected. Execution continues.
    OutOfBounds(OutOfBounds),
    /// The machine latched a fault and halted.
    Fault { pc: Address, fault: Fault },
    /// The program is stalled until a key is pressed.
    KeyWait { pc: Address },
    /// The framebuffer resolution changed.
    ModeChange(VideoMode),
    /// The presentation surface was closed.
    Closed,
}

pub trait Observer {
    fn on_event(&mut self, event: &Event);
}

/// Forwards events to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl Observer for LogObserver {
    fn on_event(&mut self, event: &Event) {
        match event {
            Event::Exec { pc, op } => log::trace!("{pc:04X}: {op}"),
            Event::OutOfBounds(err) => log::warn!("{err}"),
            Event::Fault { pc, fault } => log::error!("{pc:04X}: {fault}"),
            Event::KeyWait { pc } => log::debug!("{pc:04X}: waiting for key"),
            Event::ModeChange(mode) => log::info!("video mode set to {mode}"),
            Event::Closed => log::info!("display closed"),
        }
    }
}

/// Records events in memory.
///
/// Instruction trace events are only kept when `trace` is enabled, to keep
/// long runs cheap.
#[derive(Debug, Default, Clone)]
pub struct EventLog {
    events: Vec<Event>,
    trace: bool,
}

impl EventLog {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with_trace() -> Self {
        Self {
            events: vec![],
            trace: true,
        }
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn take(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn faults(&self) -> impl Iterator<Item = Fault> + '_ {
        self.events.iter().filter_map(|event| match event {
            Event::Fault { fault, .. } => Some(*fault),
            _ => None,
        })
    }

    pub fn out_of_bounds(&self) -> impl Iterator<Item = OutOfBounds> + '_ {
        self.events.iter().filter_map(|event| match event {
            Event::OutOfBounds(err) => Some(*err),
            _ => None,
        })
    }
}

impl Observer for EventLog {
    fn on_event(&mut self, event: &Event) {
        if matches!(event, Event::Exec { .. }) && !self.trace {
            return;
        }
        self.events.push(*event);
    }
}

impl<T: Observer + ?Sized> Observer for &mut T {
    fn on_event(&mut self, event: &Event) {
        (**self).on_event(event)
    }
}

impl<T: Observer + ?Sized> Observer for Box<T> {
    fn on_event(&mut self, event: &Event) {
        (**self).on_event(event)
    }
}
