//! Controller: the public face of one device.
//!
//! Owns the device's [`LedSurface`] (normally a `DeviceSession`), its pages,
//! the current page index, and the global sensitivity. Input arriving from
//! the session is routed to the current page only.
//!
//! # Locking
//!
//! All state lives behind one mutex. `route` collects events while holding
//! it and runs subscriber callbacks only after releasing it, so a callback
//! may call back into the controller (for example to switch pages) without
//! deadlocking.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use monome_core::{ControlError, DeviceInput, Geometry, LedSurface};
use tracing::{debug, info, warn};

use super::key_page::{GridEvent, KeyPage};
use super::page::{Page, RouteContext, VariantSpec};
use super::ring_page::{validate_sensitivity, ArcEvent, RingEvent, RingPage};
use super::subscribers::{Callback, SubscriberId, Subscribers};

/// Controller for an arc.
pub type ArcController = Controller<RingPage>;
/// Controller for a grid.
pub type GridController = Controller<KeyPage>;

struct State<P: Page> {
    pages: Vec<P>,
    current: Option<usize>,
    sensitivity: f64,
    settings: P::Settings,
    subscribers: Subscribers<P::Event>,
}

struct Shared<P: Page> {
    state: Mutex<State<P>>,
    surface: Arc<dyn LedSurface>,
}

impl<P: Page> Shared<P> {
    fn lock(&self) -> MutexGuard<'_, State<P>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn route(&self, input: DeviceInput) -> Result<(), ControlError> {
        let mut events = Vec::new();
        let callbacks = {
            let mut state = self.lock();
            let Some(current) = state.current else {
                debug!("no page yet, dropping {input:?}");
                return Ok(());
            };
            let ctx = RouteContext {
                surface: self.surface.as_ref(),
                sensitivity: state.sensitivity,
            };
            let page = &mut state.pages[current];
            page.route(input, ctx, &mut events)?;
            if events.is_empty() {
                return Ok(());
            }
            let mut callbacks = page.subscribers().snapshot();
            callbacks.extend(state.subscribers.snapshot());
            callbacks
        };
        for event in &events {
            for callback in &callbacks {
                callback(event);
            }
        }
        Ok(())
    }
}

/// A cheaply clonable handle; clones share the same pages and device.
pub struct Controller<P: Page> {
    shared: Arc<Shared<P>>,
}

impl<P: Page> Clone for Controller<P> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<P: Page> Controller<P> {
    /// A controller with no pages, drawing to `surface`.
    pub fn new(surface: Arc<dyn LedSurface>, settings: P::Settings) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    pages: Vec::new(),
                    current: None,
                    sensitivity: 1.0,
                    settings,
                    subscribers: Subscribers::new(),
                }),
                surface,
            }),
        }
    }

    pub fn geometry(&self) -> Geometry {
        self.shared.surface.geometry()
    }

    pub fn surface(&self) -> Arc<dyn LedSurface> {
        Arc::clone(&self.shared.surface)
    }

    // ── Pages ─────────────────────────────────────────────────────────────────

    /// Adds a page with the controller's default settings.
    ///
    /// The first page becomes current and is drawn immediately.
    pub fn add_page(&self, spec: impl Into<VariantSpec>) -> Result<usize, ControlError> {
        let settings = self.shared.lock().settings.clone();
        self.add_page_with(spec, &settings)
    }

    /// Adds a page with explicit settings.
    ///
    /// A first page that fails to draw is not added.
    pub fn add_page_with(&self, spec: impl Into<VariantSpec>, settings: &P::Settings) -> Result<usize, ControlError> {
        let mut state = self.shared.lock();
        let index = state.pages.len();
        let page = P::build(index, &spec.into(), self.geometry(), settings)?;
        let first = state.current.is_none();
        if first {
            page.draw(self.shared.surface.as_ref())?;
        }
        state.pages.push(page);
        if first {
            state.current = Some(index);
        }
        info!("added page {index}");
        Ok(index)
    }

    pub fn page_count(&self) -> usize {
        self.shared.lock().pages.len()
    }

    pub fn current_page(&self) -> Option<usize> {
        self.shared.lock().current
    }

    /// Makes page `index` current and redraws it. The previous page keeps its state.
    pub fn set_current_page(&self, index: usize) -> Result<(), ControlError> {
        let mut state = self.shared.lock();
        check_page(&state, index)?;
        state.current = Some(index);
        debug!("current page {index}");
        state.pages[index].draw(self.shared.surface.as_ref())
    }

    /// Advances to the next page, wrapping; returns the new current index.
    pub fn next_page(&self) -> Result<Option<usize>, ControlError> {
        let count = self.page_count();
        let Some(current) = self.current_page() else {
            return Ok(None);
        };
        let next = (current + 1) % count;
        self.set_current_page(next)?;
        Ok(Some(next))
    }

    /// Redraws the current page, if any.
    pub fn draw(&self) -> Result<(), ControlError> {
        let state = self.shared.lock();
        match state.current {
            Some(i) => state.pages[i].draw(self.shared.surface.as_ref()),
            None => Ok(()),
        }
    }

    /// Mutates page `index`, then redraws it if it is current.
    pub fn update_page<R>(&self, index: usize, f: impl FnOnce(&mut P) -> R) -> Result<R, ControlError> {
        let mut state = self.shared.lock();
        check_page(&state, index)?;
        let result = f(&mut state.pages[index]);
        if state.current == Some(index) {
            state.pages[index].draw(self.shared.surface.as_ref())?;
        }
        Ok(result)
    }

    /// Reads page `index`.
    pub fn inspect_page<R>(&self, index: usize, f: impl FnOnce(&P) -> R) -> Result<R, ControlError> {
        let state = self.shared.lock();
        check_page(&state, index)?;
        Ok(f(&state.pages[index]))
    }

    // ── Sensitivity ───────────────────────────────────────────────────────────

    pub fn sensitivity(&self) -> f64 {
        self.shared.lock().sensitivity
    }

    /// Sets the multiplier applied to encoder deltas on every page without
    /// its own override, now and for pages added later.
    pub fn set_sensitivity(&self, value: f64) -> Result<(), ControlError> {
        validate_sensitivity(value)?;
        self.shared.lock().sensitivity = value;
        Ok(())
    }

    // ── Subscribers ───────────────────────────────────────────────────────────

    /// Subscribes to events from whichever page is current.
    pub fn subscribe(&self, callback: impl Fn(&P::Event) + Send + Sync + 'static) -> SubscriberId {
        self.shared.lock().subscribers.add(Arc::new(callback))
    }

    pub fn unsubscribe(&self, id: SubscriberId) -> Result<(), ControlError> {
        self.shared.lock().subscribers.remove(id)
    }

    /// Subscribes to events from page `index` only.
    pub fn subscribe_page(
        &self,
        index: usize,
        callback: impl Fn(&P::Event) + Send + Sync + 'static,
    ) -> Result<SubscriberId, ControlError> {
        self.add_page_callback(index, Arc::new(callback))
    }

    pub fn unsubscribe_page(&self, index: usize, id: SubscriberId) -> Result<(), ControlError> {
        let mut state = self.shared.lock();
        check_page(&state, index)?;
        state.pages[index].subscribers_mut().remove(id)
    }

    fn add_page_callback(&self, index: usize, callback: Callback<P::Event>) -> Result<SubscriberId, ControlError> {
        let mut state = self.shared.lock();
        check_page(&state, index)?;
        Ok(state.pages[index].subscribers_mut().add(callback))
    }

    // ── Input ─────────────────────────────────────────────────────────────────

    /// Routes one input to the current page and notifies subscribers.
    ///
    /// Input before the first page is added is dropped.
    pub fn route(&self, input: DeviceInput) -> Result<(), ControlError> {
        self.shared.route(input)
    }

    /// [`route`](Self::route), logging instead of returning errors.
    pub fn handle_input(&self, input: DeviceInput) {
        if let Err(e) = self.route(input) {
            warn!("failed to route {input:?}: {e}");
        }
    }

    /// A callback suitable as a session input handler.
    ///
    /// It holds the controller weakly, so it does not keep the controller
    /// (and through it the session) alive.
    pub fn input_handler(&self) -> impl Fn(DeviceInput) + Send + Sync + 'static {
        let weak: Weak<Shared<P>> = Arc::downgrade(&self.shared);
        move |input| match weak.upgrade() {
            Some(shared) => {
                if let Err(e) = shared.route(input) {
                    warn!("failed to route {input:?}: {e}");
                }
            }
            None => debug!("controller dropped, ignoring {input:?}"),
        }
    }
}

fn check_page<P: Page>(state: &State<P>, index: usize) -> Result<(), ControlError> {
    if index >= state.pages.len() {
        return Err(ControlError::IndexOutOfRange {
            kind: "page",
            index,
            len: state.pages.len(),
        });
    }
    Ok(())
}

impl Controller<RingPage> {
    /// Subscribes to movements of one ring on one page.
    pub fn subscribe_ring(
        &self,
        page: usize,
        ring: usize,
        callback: impl Fn(&RingEvent) + Send + Sync + 'static,
    ) -> Result<SubscriberId, ControlError> {
        let rings = self.geometry().units();
        if ring >= rings {
            return Err(ControlError::IndexOutOfRange {
                kind: "ring",
                index: ring,
                len: rings,
            });
        }
        self.add_page_callback(
            page,
            Arc::new(move |event: &ArcEvent| match event {
                ArcEvent::Ring(e) if e.ring == ring => callback(e),
                _ => {}
            }),
        )
    }

    /// Sets or clears one page's sensitivity override.
    pub fn set_page_sensitivity(&self, page: usize, value: Option<f64>) -> Result<(), ControlError> {
        self.update_page(page, |p| p.set_sensitivity(value))?
    }
}

impl Controller<KeyPage> {
    /// Subscribes to presses of one cell on one page.
    pub fn subscribe_key(
        &self,
        page: usize,
        x: usize,
        y: usize,
        callback: impl Fn(&GridEvent) + Send + Sync + 'static,
    ) -> Result<SubscriberId, ControlError> {
        self.geometry().control_index(x, y)?;
        self.add_page_callback(
            page,
            Arc::new(move |event: &GridEvent| {
                if event.x == x && event.y == y {
                    callback(event);
                }
            }),
        )
    }
}
