pub(crate) struct Message<M> {
    pub(crate) value: M,
    pub(crate) sender: i64,
    pub(crate) receiver: i64,
}

impl<M> Message<M> {
    pub(crate) fn new(value: M, sender: i64, receiver: i64) -> Self {
        Message {
            value,
            sender,
            receiver,
        }
    }
}
