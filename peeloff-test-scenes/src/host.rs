use std::cell::{Cell, RefCell};
use std::rc::Rc;

use ahash::HashMap;
use peeloff::image::{Rgba, RgbaImage};
use peeloff::{OverlayId, OverlayLayer, Rect, SourceElement};

/// Fill color of every snapshot a [`RecordingElement`] produces.
pub const STICKER_COLOR: Rgba<u8> = Rgba([200, 60, 40, 255]);

/// Everything the interaction did to the host, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    Snapshot,
    Hide,
    Show,
    Insert(OverlayId, Rect),
    SetFrame(OverlayId, Rect),
    Remove(OverlayId),
}

type EventLog = Rc<RefCell<Vec<HostEvent>>>;

/// Overlay layer that remembers the frame of every overlay it holds.
#[derive(Debug, Default)]
pub struct RecordingLayer {
    log: EventLog,
    frames: RefCell<HashMap<OverlayId, Rect>>,
}

impl RecordingLayer {
    pub fn frame(&self, id: OverlayId) -> Option<Rect> {
        self.frames.borrow().get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.frames.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.borrow().is_empty()
    }
}

impl OverlayLayer for RecordingLayer {
    fn insert(&self, id: OverlayId, frame: Rect) {
        self.frames.borrow_mut().insert(id, frame);
        self.log.borrow_mut().push(HostEvent::Insert(id, frame));
    }

    fn set_frame(&self, id: OverlayId, frame: Rect) {
        if let Some(current) = self.frames.borrow_mut().get_mut(&id) {
            *current = frame;
        }
        self.log.borrow_mut().push(HostEvent::SetFrame(id, frame));
    }

    fn remove(&self, id: OverlayId) {
        self.frames.borrow_mut().remove(&id);
        self.log.borrow_mut().push(HostEvent::Remove(id));
    }
}

/// A fake element that records every call made to it and to its window's overlay layer.
#[derive(Debug)]
pub struct RecordingElement {
    frame: Cell<Option<Rect>>,
    hidden: Cell<bool>,
    layer: Option<Rc<RecordingLayer>>,
    log: EventLog,
}

impl RecordingElement {
    /// An element placed at `frame` in a window with an overlay layer.
    pub fn in_window(frame: Rect) -> Rc<Self> {
        let log = EventLog::default();
        Rc::new(Self {
            frame: Cell::new(Some(frame)),
            hidden: Cell::new(false),
            layer: Some(Rc::new(RecordingLayer {
                log: log.clone(),
                frames: RefCell::default(),
            })),
            log,
        })
    }

    /// An element that is not part of any window.
    pub fn orphan() -> Rc<Self> {
        Rc::new(Self {
            frame: Cell::new(None),
            hidden: Cell::new(false),
            layer: None,
            log: EventLog::default(),
        })
    }

    /// Moves the element, or takes it out of its window with `None`.
    pub fn move_to(&self, frame: Option<Rect>) {
        self.frame.set(frame);
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden.get()
    }

    pub fn layer(&self) -> Option<&Rc<RecordingLayer>> {
        self.layer.as_ref()
    }

    pub fn events(&self) -> Vec<HostEvent> {
        self.log.borrow().clone()
    }

    /// Position of the first event matching `predicate`.
    pub fn position(&self, predicate: impl Fn(&HostEvent) -> bool) -> Option<usize> {
        self.log.borrow().iter().position(predicate)
    }

    pub fn count(&self, predicate: impl Fn(&HostEvent) -> bool) -> usize {
        self.log.borrow().iter().filter(|event| predicate(event)).count()
    }
}

impl SourceElement for RecordingElement {
    fn frame_in_window(&self) -> Option<Rect> {
        self.frame.get()
    }

    fn snapshot(&self) -> Option<RgbaImage> {
        self.log.borrow_mut().push(HostEvent::Snapshot);
        let frame = self.frame.get()?;
        let width = frame.size.width.ceil().max(1.0) as u32;
        let height = frame.size.height.ceil().max(1.0) as u32;
        Some(RgbaImage::from_pixel(width, height, STICKER_COLOR))
    }

    fn set_hidden(&self, hidden: bool) {
        if self.hidden.replace(hidden) != hidden {
            self.log.borrow_mut().push(if hidden {
                HostEvent::Hide
            } else {
                HostEvent::Show
            });
        }
    }

    fn overlay_layer(&self) -> Option<Rc<dyn OverlayLayer>> {
        self.layer
            .clone()
            .map(|layer| layer as Rc<dyn OverlayLayer>)
    }
}
