//! Size-bounded message packing.
//!
//! Rendered items are joined into as few messages as a single left-to-right
//! pass allows. An item is never split, and items keep their order across
//! messages. An item that is longer than the limit on its own is sent as a
//! single oversized message rather than being truncated.

/// How a channel turns rendered items into message bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Packing {
    /// Every item is its own message.
    Separate,
    /// Items are joined greedily up to this many characters (0 = unbounded).
    Bounded(usize),
}

impl Packing {
    /// Choose the packing for a channel.
    pub fn for_channel(send_separately: bool, limit: usize) -> Self {
        if send_separately {
            Packing::Separate
        } else {
            Packing::Bounded(limit)
        }
    }

    /// Pack rendered items into message bodies.
    ///
    /// Items that render to an empty string never produce a message of their
    /// own, in either mode.
    pub fn pack<S: AsRef<str>>(&self, items: &[S]) -> Vec<String> {
        match *self {
            Packing::Separate => items
                .iter()
                .map(|s| s.as_ref())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            Packing::Bounded(limit) => packetize(items, limit),
        }
    }
}

/// Message length as counted by push services: Unicode scalar values.
pub fn message_len(text: &str) -> usize {
    text.chars().count()
}

/// Greedy running-buffer packing of `items` into messages of at most `limit`
/// characters. A `limit` of 0 puts everything in one message.
pub fn packetize<S: AsRef<str>>(items: &[S], limit: usize) -> Vec<String> {
    let mut messages = Vec::new();
    let mut buffer = String::new();
    let mut buffer_len = 0;

    for item in items {
        let item = item.as_ref();
        let item_len = message_len(item);

        if limit > 0 && !buffer.is_empty() && buffer_len + item_len > limit {
            messages.push(std::mem::take(&mut buffer));
            buffer_len = 0;
        }

        buffer.push_str(item);
        buffer_len += item_len;
    }

    if !buffer.is_empty() {
        messages.push(buffer);
    }

    messages
}
