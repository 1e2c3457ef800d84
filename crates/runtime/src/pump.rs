use std::cell::{Ref, RefCell};
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

/// State driven one input at a time by a [`Pump`].
pub trait Reactor: Sized {
    type Input;

    fn handle(&mut self, input: Self::Input, pump: &Rc<Pump<Self>>);

    /// Once this returns `true`, pending and later inputs are dropped.
    fn is_closed(&self) -> bool {
        false
    }
}

/// FIFO of inputs applied to a [`Reactor`] strictly one after another.
///
/// Dispatching from inside `handle` (directly, or through a callback the
/// reactor invokes) only enqueues; the pump already running further up the
/// stack applies the input after the current one.
pub struct Pump<S: Reactor> {
    state: RefCell<S>,
    queue: RefCell<VecDeque<S::Input>>,
}

impl<S: Reactor> Pump<S> {
    pub fn new(state: S) -> Rc<Self> {
        Rc::new(Self {
            state: RefCell::new(state),
            queue: RefCell::new(VecDeque::new()),
        })
    }

    pub fn dispatch(self: &Rc<Self>, input: S::Input) {
        self.queue.borrow_mut().push_back(input);
        self.run();
    }

    /// Dispatches if the pump is still alive.
    pub fn dispatch_weak(weak: &Weak<Self>, input: S::Input) {
        if let Some(pump) = weak.upgrade() {
            pump.dispatch(input);
        }
    }

    /// Drops inputs that have not been applied yet.
    pub fn clear_pending(&self) {
        self.queue.borrow_mut().clear();
    }

    /// Shared view of the state, or `None` while an input is being applied.
    pub fn try_state(&self) -> Option<Ref<'_, S>> {
        self.state.try_borrow().ok()
    }

    fn run(self: &Rc<Self>) {
        loop {
            let Ok(mut state) = self.state.try_borrow_mut() else {
                return;
            };
            if state.is_closed() {
                self.clear_pending();
                return;
            }
            let Some(input) = self.queue.borrow_mut().pop_front() else {
                return;
            };
            state.handle(input, self);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Step {
        Plain(u32),
        Echo(u32),
        Close,
    }

    #[derive(Default)]
    struct Recorder {
        applied: Vec<Step>,
        closed: bool,
    }

    impl Reactor for Recorder {
        type Input = Step;

        fn handle(&mut self, input: Step, pump: &Rc<Pump<Self>>) {
            self.applied.push(input);
            match input {
                Step::Echo(n) => {
                    pump.dispatch(Step::Plain(n + 100));
                    // Still this input's turn.
                    self.applied.push(Step::Plain(n));
                }
                Step::Close => self.closed = true,
                Step::Plain(_) => {}
            }
        }

        fn is_closed(&self) -> bool {
            self.closed
        }
    }

    fn applied(pump: &Rc<Pump<Recorder>>) -> Vec<Step> {
        pump.try_state().map(|s| s.applied.clone()).unwrap_or_default()
    }

    #[test]
    fn nested_dispatch_runs_after_current_input() {
        let pump = Pump::new(Recorder::default());
        pump.dispatch(Step::Echo(1));
        pump.dispatch(Step::Plain(2));
        assert_eq!(
            applied(&pump),
            vec![Step::Echo(1), Step::Plain(1), Step::Plain(101), Step::Plain(2)]
        );
    }

    #[derive(Default)]
    struct Closer {
        applied: Vec<&'static str>,
        closed: bool,
    }

    impl Reactor for Closer {
        type Input = &'static str;

        fn handle(&mut self, input: &'static str, pump: &Rc<Pump<Self>>) {
            match input {
                "click" => {
                    // A callback asking to close mid-input.
                    pump.clear_pending();
                    pump.dispatch("close");
                    self.applied.push("click");
                }
                "close" => self.closed = true,
                other => self.applied.push(other),
            }
        }

        fn is_closed(&self) -> bool {
            self.closed
        }
    }

    #[test]
    fn close_requested_mid_input_takes_effect_after_it() {
        let pump = Pump::new(Closer::default());
        pump.dispatch("click");
        assert!(pump.try_state().is_some_and(|s| s.closed));
        pump.dispatch("tick");
        assert_eq!(
            pump.try_state().map(|s| s.applied.clone()),
            Some(vec!["click"])
        );
    }

    #[test]
    fn state_is_unavailable_while_applying() {
        struct Peek(Option<bool>);
        impl Reactor for Peek {
            type Input = ();
            fn handle(&mut self, _: (), pump: &Rc<Pump<Self>>) {
                self.0 = Some(pump.try_state().is_some());
            }
        }
        let pump = Pump::new(Peek(None));
        pump.dispatch(());
        assert_eq!(pump.try_state().and_then(|s| s.0), Some(false));
    }

    #[test]
    fn dispatch_weak_after_drop_is_ignored() {
        let pump = Pump::new(Recorder::default());
        let weak = Rc::downgrade(&pump);
        drop(pump);
        Pump::dispatch_weak(&weak, Step::Plain(1));
    }

    #[test]
    fn closed_pump_ignores_inputs() {
        let pump = Pump::new(Recorder::default());
        pump.dispatch(Step::Close);
        pump.dispatch(Step::Plain(7));
        assert_eq!(applied(&pump), vec![Step::Close]);
    }
}
