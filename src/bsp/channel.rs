use std::sync::mpsc;

use tracing::warn;

use super::message::Message;

enum Packet<M> {
    Msg(Message<M>),
    Done,
}

/// All-to-all message fabric between workers. Each worker owns one `Channel`:
/// its own receiver plus a sender for every worker (itself included). A
/// worker signals the end of its sends for the round with `done`; the drain
/// iterator runs until every worker's `Done` has arrived, which is the
/// routing half of the superstep barrier.
pub(crate) struct Channel<M> {
    receiver: mpsc::Receiver<Packet<M>>,
    senders: Vec<mpsc::Sender<Packet<M>>>,
}

impl<M> Channel<M> {
    pub(crate) fn create(n: usize) -> Vec<Channel<M>> {
        let (senders, receivers): (Vec<_>, Vec<_>) = (0..n).map(|_| mpsc::channel()).unzip();

        receivers
            .into_iter()
            .map(|receiver| Channel {
                receiver,
                senders: senders.clone(),
            })
            .collect()
    }

    /// Routes a message to the worker owning its receiver.
    pub(crate) fn route(&self, message: Message<M>) {
        let index = message.receiver.rem_euclid(self.senders.len() as i64) as usize;
        if let Err(e) = self.senders[index].send(Packet::Msg(message)) {
            warn!("failed to route message: {e}");
        }
    }

    pub(crate) fn done(&self) {
        for sender in &self.senders {
            if let Err(e) = sender.send(Packet::Done) {
                warn!("failed to send round-done signal: {e}");
            }
        }
    }
}

impl<'a, M> IntoIterator for &'a Channel<M> {
    type Item = Message<M>;
    type IntoIter = ChannelIterator<'a, M>;

    fn into_iter(self) -> Self::IntoIter {
        ChannelIterator {
            done_count: 0,
            channel: self,
        }
    }
}

pub(crate) struct ChannelIterator<'a, M> {
    done_count: usize,
    channel: &'a Channel<M>,
}

impl<'a, M> Iterator for ChannelIterator<'a, M> {
    type Item = Message<M>;

    fn next(&mut self) -> Option<Message<M>> {
        while let Ok(packet) = self.channel.receiver.recv() {
            match packet {
                Packet::Msg(message) => return Some(message),
                Packet::Done => {
                    self.done_count += 1;
                    if self.done_count >= self.channel.senders.len() {
                        return None;
                    }
                }
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_by_receiver_modulo_worker_count() {
        let channels = Channel::create(3);

        channels[0].route(Message::new("a", 0, 4));
        channels[2].route(Message::new("b", 2, 0));
        for channel in &channels {
            channel.done();
        }

        let to_worker_1: Vec<_> = (&channels[1]).into_iter().map(|m| m.value).collect();
        assert_eq!(to_worker_1, vec!["a"]);

        let to_worker_0: Vec<_> = (&channels[0]).into_iter().map(|m| m.value).collect();
        assert_eq!(to_worker_0, vec!["b"]);

        let to_worker_2: Vec<&str> = (&channels[2]).into_iter().map(|m| m.value).collect();
        assert!(to_worker_2.is_empty());
    }

    #[test]
    fn drain_stops_after_all_done_signals() {
        let channels: Vec<Channel<i64>> = Channel::create(2);
        channels[0].done();
        channels[1].done();
        assert_eq!((&channels[0]).into_iter().count(), 0);
        assert_eq!((&channels[1]).into_iter().count(), 0);
    }
}
