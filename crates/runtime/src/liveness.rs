use std::cell::Cell;
use std::rc::Rc;

/// Liveness flag owned by a mounted view.
///
/// Asynchronous callbacks (feed responses, geolocation results) hold a
/// [`LivenessToken`] and must check it before touching the view. Killing the
/// flag is irreversible.
#[derive(Debug)]
pub struct Liveness {
    alive: Rc<Cell<bool>>,
}

/// Cheap, clonable observer of a [`Liveness`] flag.
#[derive(Debug, Clone)]
pub struct LivenessToken {
    alive: Rc<Cell<bool>>,
}

impl Liveness {
    pub fn new() -> Self {
        Self {
            alive: Rc::new(Cell::new(true)),
        }
    }

    pub fn token(&self) -> LivenessToken {
        LivenessToken {
            alive: Rc::clone(&self.alive),
        }
    }

    pub fn kill(&self) {
        self.alive.set(false);
    }
}

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Liveness {
    fn drop(&mut self) {
        self.kill();
    }
}

impl LivenessToken {
    pub fn is_alive(&self) -> bool {
        self.alive.get()
    }
}
