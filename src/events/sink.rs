use super::Event;

/// Receiver for interaction events. Implemented for closures out of the box,
/// and for crossbeam senders behind the `events` feature.
pub trait EventSink {
    fn send(&self, event: Event);
}

impl<F> EventSink for F
where
    F: Fn(Event),
{
    fn send(&self, event: Event) {
        self(event);
    }
}

#[cfg(feature = "events")]
impl EventSink for crossbeam::channel::Sender<Event> {
    fn send(&self, event: Event) {
        // A disconnected receiver is not an error for the view.
        let _ = crossbeam::channel::Sender::send(self, event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::PayloadNavigateTo;
    use std::cell::RefCell;

    #[test]
    fn closures_receive_events() {
        let received = RefCell::new(Vec::new());
        let sink = |e: Event| received.borrow_mut().push(e);

        EventSink::send(&sink, Event::NavigateTo(PayloadNavigateTo { address: 1 }));

        assert_eq!(
            received.into_inner(),
            vec![Event::NavigateTo(PayloadNavigateTo { address: 1 })]
        );
    }
}
